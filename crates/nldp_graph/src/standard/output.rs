// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sink nodes. They have no output rows; what they receive is kept as
//! dead-end values for the host to display or act on.

use crate::evaluation::{from_fn, EvaluationError, Inputs, NodeEvaluator, NodeOutput};
use crate::layout::{NodeCategory, NodeLayout, RowLayout, WidgetKind};
use crate::node::Node;
use crate::registry::{NodeRegistry, NodeType};
use crate::value::DataType;
use std::path::PathBuf;
use std::sync::Arc;

/// Row of the write node holding the target path
pub const WRITE_PATH_ROW: usize = 1;

/// Register the output nodes
pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeType::new(
        NodeLayout::new("output", "Output", NodeCategory::Output)
            .with_description("Receives a value for display")
            .with_color([50, 50, 70])
            .row(RowLayout::input("Input", DataType::Any)),
        capture(),
    ));

    registry.register(NodeType::new(
        NodeLayout::new("write_file", "Write File", NodeCategory::Output)
            .with_description("Holds text to write when executed")
            .with_color([50, 70, 50])
            .row(RowLayout::input("Data", DataType::String))
            .row(
                RowLayout::static_field("File Path", DataType::FilePath, "")
                    .with_widget(WidgetKind::FileBrowser),
            ),
        // Cooking only captures the data; writing is an explicit action
        capture(),
    ));
}

/// Keep the value on row 0 as the node's only dead-end value
fn capture() -> Arc<dyn NodeEvaluator> {
    from_fn(|inputs: &Inputs| {
        Ok(NodeOutput::new().with_dead_end(vec![inputs.get(0).cloned()]))
    })
}

/// Write the content captured by a cooked write node to its target path.
///
/// Returns the path written.
pub fn execute_write(node: &Node) -> Result<PathBuf, EvaluationError> {
    let path = node
        .field(WRITE_PATH_ROW)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .ok_or(EvaluationError::MissingInput(WRITE_PATH_ROW))?;

    let content = node
        .dead_end_values()
        .first()
        .cloned()
        .flatten()
        .ok_or(EvaluationError::MissingInput(0))?;

    std::fs::write(&path, content.to_string())?;
    tracing::info!(path = %path.display(), "Wrote file");
    Ok(path)
}
