// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node instances: rows, ports, editable fields and cached outputs.

use crate::evaluation::{NodeEvaluator, NodeOutput};
use crate::layout::{FieldRole, NodeLayout, RowLayout};
use crate::port::{Port, PortKind};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cache validity of a node's outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Outputs are valid
    Clean,
    /// Outputs are stale and must be cooked before reading
    Dirty,
}

/// One instantiated layout row
#[derive(Debug, Clone)]
pub struct Row {
    layout: RowLayout,
    port: Option<Port>,
    value: Option<String>,
}

impl Row {
    fn from_layout(layout: &RowLayout) -> Self {
        let data_type = layout.data_type;
        let (port, value) = match layout.role {
            FieldRole::Input => (Some(Port::input(data_type)), layout.default_value.clone()),
            FieldRole::Dynamic => (
                Some(Port::input(data_type)),
                Some(layout.default_value.clone().unwrap_or_default()),
            ),
            FieldRole::MultiInput => (Some(Port::multi_input(data_type)), None),
            FieldRole::Output => (Some(Port::output(data_type)), None),
            FieldRole::Static => (None, Some(layout.default_value.clone().unwrap_or_default())),
        };

        Self {
            layout: layout.clone(),
            port,
            value,
        }
    }

    /// Row schema
    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Row role
    pub fn role(&self) -> FieldRole {
        self.layout.role
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.layout.label
    }

    /// Socket, if the row has one
    pub fn port(&self) -> Option<&Port> {
        self.port.as_ref()
    }

    /// Current field text, if the row is editable
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// A node instance in the graph
pub struct Node {
    id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Custom body color
    pub color: Option<[u8; 3]>,
    rows: Vec<Row>,
    state: NodeState,
    outputs: IndexMap<usize, Value>,
    dead_end_values: Vec<Option<Value>>,
    evaluator: Arc<dyn NodeEvaluator>,
}

impl Node {
    /// Create a new node from a layout and its evaluation strategy
    pub fn new(layout: &NodeLayout, evaluator: Arc<dyn NodeEvaluator>) -> Self {
        Self {
            id: NodeId::new(),
            node_type: layout.type_id.clone(),
            title: layout.title.clone(),
            position: [0.0, 0.0],
            color: layout.color,
            rows: layout.rows.iter().map(Row::from_layout).collect(),
            state: NodeState::Dirty,
            outputs: IndexMap::new(),
            dead_end_values: Vec::new(),
            evaluator,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Unique instance ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// All rows in layout order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get a row by index
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    /// Find the index of the first row with a label
    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.label() == label)
    }

    /// Get the port on a row
    pub fn port(&self, row: usize) -> Option<&Port> {
        self.rows.get(row).and_then(Row::port)
    }

    /// All ports with their row indices
    pub fn ports(&self) -> impl Iterator<Item = (usize, &Port)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.port().map(|p| (i, p)))
    }

    /// Output ports in row order
    pub fn output_ports(&self) -> impl Iterator<Item = (usize, &Port)> {
        self.ports().filter(|(_, p)| p.kind() == PortKind::Output)
    }

    /// Current field text of a row
    pub fn field(&self, row: usize) -> Option<&str> {
        self.rows.get(row).and_then(Row::value)
    }

    /// Editable fields with their row indices
    pub fn fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.value().map(|v| (i, v)))
    }

    /// Evaluation state
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Whether outputs are stale
    pub fn is_dirty(&self) -> bool {
        self.state == NodeState::Dirty
    }

    /// Last cooked outputs by row. Stale while the node is dirty.
    pub fn outputs(&self) -> &IndexMap<usize, Value> {
        &self.outputs
    }

    /// Last cooked value of an output row
    pub fn output(&self, row: usize) -> Option<&Value> {
        self.outputs.get(&row)
    }

    /// Values captured by sink nodes on their last cook
    pub fn dead_end_values(&self) -> &[Option<Value>] {
        &self.dead_end_values
    }

    /// Evaluation strategy
    pub fn evaluator(&self) -> &Arc<dyn NodeEvaluator> {
        &self.evaluator
    }

    pub(crate) fn port_mut(&mut self, row: usize) -> Option<&mut Port> {
        self.rows.get_mut(row).and_then(|r| r.port.as_mut())
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    /// Replace the field text of a row, reporting whether it changed
    pub(crate) fn set_field(&mut self, row: usize, text: &str) -> Result<bool, FieldError> {
        let field = self.rows.get_mut(row).ok_or(FieldError::RowNotFound(row))?;
        let value = field
            .value
            .as_mut()
            .ok_or(FieldError::NotEditable { row, role: field.layout.role })?;

        if value.as_str() == text {
            return Ok(false);
        }
        *value = text.to_string();
        Ok(true)
    }

    /// Publish a cook result. Values for rows that are not outputs are dropped.
    pub(crate) fn store(&mut self, output: NodeOutput) {
        let NodeOutput { values, dead_end } = output;
        self.outputs.clear();
        for (row, value) in values {
            match self.rows.get(row).map(Row::role) {
                Some(FieldRole::Output) => {
                    self.outputs.insert(row, value);
                }
                _ => tracing::warn!(
                    node = %self.id,
                    title = %self.title,
                    row,
                    "Evaluator produced a value for a row that is not an output"
                ),
            }
        }
        self.outputs.sort_keys();
        self.dead_end_values = dead_end;
        self.state = NodeState::Clean;
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("title", &self.title)
            .field("state", &self.state)
            .field("rows", &self.rows)
            .field("outputs", &self.outputs)
            .field("dead_end_values", &self.dead_end_values)
            .finish_non_exhaustive()
    }
}

/// Error when editing a field
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Row index out of range
    #[error("Row not found: {0}")]
    RowNotFound(usize),

    /// Row has no editable value
    #[error("Row {row} ({role:?}) has no editable value")]
    NotEditable {
        /// Row index
        row: usize,
        /// Role of the row
        role: FieldRole,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{from_fn, Inputs};
    use crate::layout::NodeCategory;
    use crate::value::DataType;

    fn passthrough() -> Arc<dyn NodeEvaluator> {
        from_fn(|inputs: &Inputs| Ok(NodeOutput::new().with(3, inputs.get(0).cloned())))
    }

    fn layout() -> NodeLayout {
        NodeLayout::new("test", "Test", NodeCategory::Custom)
            .row(RowLayout::static_field("Value", DataType::Float, "1.5"))
            .row(RowLayout::dynamic("Offset", DataType::Float, "0"))
            .row(RowLayout::input("In", DataType::Any))
            .row(RowLayout::output("Out", DataType::Float))
            .row(RowLayout::multi_input("Many", DataType::Float))
    }

    #[test]
    fn test_rows_from_layout() {
        let node = Node::new(&layout(), passthrough());
        assert!(node.is_dirty());
        assert_eq!(node.rows().len(), 5);
        assert!(node.port(0).is_none());
        assert_eq!(node.port(1).map(Port::kind), Some(PortKind::Input));
        assert_eq!(node.port(3).map(Port::kind), Some(PortKind::Output));
        assert!(node.port(4).is_some_and(Port::is_multi_connect));
        assert_eq!(node.field(0), Some("1.5"));
        assert_eq!(node.field(1), Some("0"));
        assert_eq!(node.field(2), None);
        assert_eq!(node.output_ports().map(|(i, _)| i).collect::<Vec<_>>(), vec![3]);
        assert_eq!(node.row_index("Out"), Some(3));
    }

    #[test]
    fn test_set_field() {
        let mut node = Node::new(&layout(), passthrough());
        assert!(node.set_field(0, "2.5").unwrap());
        assert!(!node.set_field(0, "2.5").unwrap());
        assert_eq!(node.field(0), Some("2.5"));
        assert!(matches!(node.set_field(3, "1"), Err(FieldError::NotEditable { row: 3, .. })));
        assert!(matches!(node.set_field(9, "1"), Err(FieldError::RowNotFound(9))));
    }

    #[test]
    fn test_store_drops_non_output_rows() {
        let mut node = Node::new(&layout(), passthrough());
        node.store(
            NodeOutput::new()
                .with(3, Some(Value::Float(1.0)))
                .with(0, Some(Value::Float(2.0))),
        );
        assert!(!node.is_dirty());
        assert_eq!(node.outputs().len(), 1);
        assert_eq!(node.output(3), Some(&Value::Float(1.0)));
    }
}
