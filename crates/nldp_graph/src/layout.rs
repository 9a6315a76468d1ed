// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node layouts: the row schema a node designer hands to the engine.
//!
//! A layout is an ordered list of rows. Each row is an input socket, an
//! output socket, a static field (editable value, no socket), a dynamic
//! field (socket plus an editable fallback value) or a multi-input socket
//! that aggregates any number of links. Row indices are the keys used for
//! inputs and outputs throughout evaluation.
//!
//! Layouts are plain data and can be authored in RON:
//!
//! ```ron
//! NodeLayout(
//!     type_id: "scale",
//!     title: "Scale",
//!     category: Math,
//!     rows: [
//!         (role: Dynamic, label: "Value", data_type: Float, default_value: Some("1.0")),
//!         (role: Output, label: "Output", data_type: Float),
//!     ],
//! )
//! ```

use crate::value::DataType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Role of a layout row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRole {
    /// Input socket, optionally with a fallback value
    Input,
    /// Output socket
    Output,
    /// Editable value without a socket
    Static,
    /// Input socket with an editable fallback value
    Dynamic,
    /// Input socket aggregating any number of links
    MultiInput,
}

/// Editing widget requested for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    /// Single line text entry
    LineEdit,
    /// Text entry with a file browse button
    FileBrowser,
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, files)
    Input,
    /// Output nodes (sinks, writers)
    Output,
    /// Math operations
    Math,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

fn any_type() -> DataType {
    DataType::Any
}

/// One row of a node layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowLayout {
    /// Row role
    pub role: FieldRole,
    /// Display label
    pub label: String,
    /// Declared data type
    #[serde(default = "any_type")]
    pub data_type: DataType,
    /// Initial field text
    #[serde(default)]
    pub default_value: Option<String>,
    /// Editing widget
    #[serde(default)]
    pub widget: Option<WidgetKind>,
}

impl RowLayout {
    fn new(role: FieldRole, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            role,
            label: label.into(),
            data_type,
            default_value: None,
            widget: None,
        }
    }

    /// Input socket row
    pub fn input(label: impl Into<String>, data_type: DataType) -> Self {
        Self::new(FieldRole::Input, label, data_type)
    }

    /// Output socket row
    pub fn output(label: impl Into<String>, data_type: DataType) -> Self {
        Self::new(FieldRole::Output, label, data_type)
    }

    /// Multi-input socket row
    pub fn multi_input(label: impl Into<String>, data_type: DataType) -> Self {
        Self::new(FieldRole::MultiInput, label, data_type)
    }

    /// Static field row edited through a line edit
    pub fn static_field(
        label: impl Into<String>,
        data_type: DataType,
        default: impl Into<String>,
    ) -> Self {
        Self::new(FieldRole::Static, label, data_type)
            .with_default(default)
            .with_widget(WidgetKind::LineEdit)
    }

    /// Dynamic field row edited through a line edit
    pub fn dynamic(
        label: impl Into<String>,
        data_type: DataType,
        default: impl Into<String>,
    ) -> Self {
        Self::new(FieldRole::Dynamic, label, data_type)
            .with_default(default)
            .with_widget(WidgetKind::LineEdit)
    }

    /// Set the initial field text
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_value = Some(text.into());
        self
    }

    /// Set the editing widget
    pub fn with_widget(mut self, widget: WidgetKind) -> Self {
        self.widget = Some(widget);
        self
    }
}

/// Full schema of a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    /// Unique type identifier
    pub type_id: String,
    /// Default title
    pub title: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Body color
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Rows in display order
    pub rows: Vec<RowLayout>,
}

impl NodeLayout {
    /// Create an empty layout
    pub fn new(
        type_id: impl Into<String>,
        title: impl Into<String>,
        category: NodeCategory,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            title: title.into(),
            category,
            description: String::new(),
            color: None,
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn row(mut self, row: RowLayout) -> Self {
        self.rows.push(row);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the body color
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    /// Indices of output rows
    pub fn output_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.role == FieldRole::Output)
            .map(|(i, _)| i)
    }

    /// Check the layout is usable by the engine
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.rows.is_empty() {
            return Err(LayoutError::Empty(self.type_id.clone()));
        }

        for (row, layout) in self.rows.iter().enumerate() {
            match layout.role {
                FieldRole::Output if layout.default_value.is_some() => {
                    return Err(LayoutError::OutputDefault { row });
                }
                FieldRole::MultiInput if layout.default_value.is_some() => {
                    return Err(LayoutError::MultiInputDefault { row });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse and validate a layout from RON
    pub fn from_ron(source: &str) -> Result<Self, LayoutError> {
        let layout: NodeLayout = ron::from_str(source)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Serialize the layout to pretty RON
    pub fn to_ron(&self) -> Result<String, LayoutError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load and validate a layout from a RON file
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }
}

/// Error in a node layout
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Layout has no rows
    #[error("Layout '{0}' has no rows")]
    Empty(String),

    /// Output rows cannot carry a value
    #[error("Output row {row} declares a default value")]
    OutputDefault {
        /// Row index
        row: usize,
    },

    /// Multi-input rows have no single fallback value
    #[error("Multi-input row {row} declares a default value")]
    MultiInputDefault {
        /// Row index
        row: usize,
    },

    /// RON parse error
    #[error("Failed to parse layout: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Failed to serialize layout: {0}")]
    Serialize(#[from] ron::Error),

    /// File read error
    #[error("Failed to read layout: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: &str = r#"
        NodeLayout(
            type_id: "scale",
            title: "Scale",
            category: Math,
            rows: [
                (role: Dynamic, label: "Value", data_type: Float, default_value: Some("1.0")),
                (
                    role: Static,
                    label: "Factor",
                    data_type: Float,
                    default_value: Some("2.0"),
                    widget: Some(LineEdit),
                ),
                (role: Output, label: "Output"),
            ],
        )
    "#;

    #[test]
    fn test_parse_ron_layout() {
        let layout = NodeLayout::from_ron(SCALE).unwrap();
        assert_eq!(layout.type_id, "scale");
        assert_eq!(layout.rows.len(), 3);
        assert_eq!(layout.rows[0].role, FieldRole::Dynamic);
        assert_eq!(layout.rows[1].widget, Some(WidgetKind::LineEdit));
        assert_eq!(layout.rows[2].data_type, DataType::Any);
        assert_eq!(layout.output_rows().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_ron_roundtrip() {
        let layout = NodeLayout::new("value", "Value", NodeCategory::Input)
            .row(RowLayout::static_field("Value", DataType::Float, "0.0"))
            .row(RowLayout::output("Output", DataType::Float))
            .with_color([50, 50, 70]);
        let text = layout.to_ron().unwrap();
        assert_eq!(NodeLayout::from_ron(&text).unwrap(), layout);
    }

    #[test]
    fn test_validation() {
        let empty = NodeLayout::new("empty", "Empty", NodeCategory::Custom);
        assert!(matches!(empty.validate(), Err(LayoutError::Empty(_))));

        let bad_output = NodeLayout::new("bad", "Bad", NodeCategory::Custom)
            .row(RowLayout::output("Out", DataType::Float).with_default("1"));
        assert!(matches!(bad_output.validate(), Err(LayoutError::OutputDefault { row: 0 })));

        let bad_multi = NodeLayout::new("bad", "Bad", NodeCategory::Custom)
            .row(RowLayout::output("Out", DataType::Float))
            .row(RowLayout::multi_input("In", DataType::Float).with_default("1"));
        assert!(matches!(bad_multi.validate(), Err(LayoutError::MultiInputDefault { row: 1 })));

        assert!(matches!(NodeLayout::from_ron("NodeLayout("), Err(LayoutError::Parse(_))));
    }
}
