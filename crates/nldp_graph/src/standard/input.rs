// SPDX-License-Identifier: MIT OR Apache-2.0
//! Source nodes: user-entered constants and file readers.

use crate::evaluation::{from_fn, EvaluationError, Inputs, NodeEvaluator, NodeOutput};
use crate::layout::{NodeCategory, NodeLayout, RowLayout, WidgetKind};
use crate::registry::{NodeRegistry, NodeType};
use crate::value::{DataType, Value};
use std::io::ErrorKind;
use std::sync::Arc;

/// Register the input nodes
pub fn register(registry: &mut NodeRegistry) {
    registry.register(constant("value", "Value", DataType::Float, "0.0"));
    registry.register(constant("integer", "Integer", DataType::Integer, "0"));
    registry.register(constant("string", "String", DataType::String, ""));

    registry.register(NodeType::new(
        NodeLayout::new("file_path", "File Path", NodeCategory::Input)
            .with_description("Path picked with a file browser")
            .row(path_field())
            .row(RowLayout::output("Path", DataType::FilePath)),
        forward(),
    ));

    registry.register(NodeType::new(
        NodeLayout::new("file", "File", NodeCategory::Input)
            .with_description("Reads the contents of a .txt file")
            .row(path_field())
            .row(RowLayout::output("Data", DataType::String)),
        Arc::new(TextFileReader),
    ));
}

/// Single static field passed straight to the output row
fn constant(type_id: &str, title: &str, data_type: DataType, default: &str) -> NodeType {
    NodeType::new(
        NodeLayout::new(type_id, title, NodeCategory::Input)
            .with_description(format!("Constant {data_type} value"))
            .row(RowLayout::static_field("Value", data_type, default))
            .row(RowLayout::output("Output", data_type)),
        forward(),
    )
}

fn path_field() -> RowLayout {
    RowLayout::static_field("File Path", DataType::FilePath, "")
        .with_widget(WidgetKind::FileBrowser)
}

fn forward() -> Arc<dyn NodeEvaluator> {
    from_fn(|inputs: &Inputs| Ok(NodeOutput::new().with(1, inputs.get(0).cloned())))
}

/// Reads a text file named by row 0 into row 1.
///
/// A missing or unreadable file yields no value; any extension other than
/// `.txt` fails the evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFileReader;

impl NodeEvaluator for TextFileReader {
    fn evaluate(&self, inputs: &Inputs) -> Result<NodeOutput, EvaluationError> {
        let Some(path) = inputs.path(0).filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(NodeOutput::new());
        };

        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !is_text {
            return Err(EvaluationError::UnsupportedFile(path.to_path_buf()));
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => Some(Value::String(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "File not found");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
                None
            }
        };

        Ok(NodeOutput::new().with(1, contents))
    }
}
