// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session: the engine surface a canvas UI talks to.
//!
//! The session pairs a [`Graph`] with the [`NodeRegistry`] it instantiates
//! nodes from, and turns UI gestures (spawn, wire, edit, evaluate, inspect,
//! delete) into graph operations. Rejected wires leave the graph as it was,
//! so the UI only has to snap the wire back.

use crate::evaluation::EvaluationError;
use crate::graph::{ConnectionError, Graph};
use crate::link::{Link, LinkId};
use crate::node::{FieldError, Node, NodeId, NodeState};
use crate::port::PortId;
use crate::registry::NodeRegistry;
use crate::standard::{self, output};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// Result of evaluating one node
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Output values by row, for nodes with output rows
    Outputs(IndexMap<usize, Value>),
    /// Values captured by a sink node
    DeadEnd(Vec<Option<Value>>),
}

/// Snapshot of a node's state for display
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    /// Node ID
    pub id: NodeId,
    /// Title
    pub title: String,
    /// Node type ID
    pub node_type: String,
    /// Evaluation state
    pub state: NodeState,
    /// Editable fields as (row, label, text)
    pub fields: Vec<(usize, String, String)>,
    /// Cached outputs by row
    pub outputs: IndexMap<usize, Value>,
    /// Dead-end values
    pub dead_end: Vec<Option<Value>>,
}

impl NodeReport {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id(),
            title: node.title.clone(),
            node_type: node.node_type.clone(),
            state: node.state(),
            fields: node
                .fields()
                .map(|(row, text)| {
                    let label = node.row(row).map(|r| r.label().to_string()).unwrap_or_default();
                    (row, label, text.to_string())
                })
                .collect(),
            outputs: node.outputs().clone(),
            dead_end: node.dead_end_values().to_vec(),
        }
    }
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] ({:?})", self.title, self.node_type, self.state)?;
        for (row, label, text) in &self.fields {
            writeln!(f, "  field {row} {label}: {text:?}")?;
        }
        for (row, value) in &self.outputs {
            writeln!(f, "  output {row}: {value}")?;
        }
        for value in &self.dead_end {
            match value {
                Some(value) => writeln!(f, "  dead end: {value}")?,
                None => writeln!(f, "  dead end: <none>")?,
            }
        }
        Ok(())
    }
}

/// An editing session over one graph
#[derive(Debug)]
pub struct EditorSession {
    graph: Graph,
    registry: NodeRegistry,
}

impl EditorSession {
    /// Create a session over an empty graph
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            graph: Graph::default(),
            registry,
        }
    }

    /// Create a session offering the standard node library
    pub fn with_standard_nodes() -> Self {
        Self::new(standard::create_standard_registry())
    }

    /// The graph being edited
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Node types available to spawn
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable access to the node types
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Spawn a node of a registered type at a canvas position
    pub fn add_node(&mut self, type_id: &str, position: [f32; 2]) -> Result<NodeId, SessionError> {
        let node = self
            .registry
            .create_node(type_id)
            .ok_or_else(|| SessionError::UnknownNodeType(type_id.to_string()))?
            .with_position(position[0], position[1]);
        Ok(self.graph.add_node(node))
    }

    /// Delete nodes and every wire touching them, returning how many were removed
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter()
            .filter(|id| self.graph.remove_node(**id).is_some())
            .count()
    }

    /// Wire two sockets dragged in either direction
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<LinkId, SessionError> {
        self.graph.connect_sockets(a, b).map_err(|e| {
            tracing::debug!(error = %e, "Wire rejected");
            SessionError::from(e)
        })
    }

    /// Delete a wire
    pub fn disconnect(&mut self, link: LinkId) -> Option<Link> {
        self.graph.disconnect(link)
    }

    /// Apply a field edit from the UI
    pub fn edit_field(&mut self, node: NodeId, row: usize, text: &str) -> Result<(), SessionError> {
        self.graph.set_field(node, row, text)?;
        Ok(())
    }

    /// Cook a node and read back its outputs, or its dead-end values for sinks
    pub fn evaluate(&mut self, node_id: NodeId) -> Result<Evaluation, SessionError> {
        tracing::info!(node = %node_id, "Starting evaluation");
        if let Err(e) = self.graph.cook(node_id) {
            tracing::error!(node = %node_id, error = %e, "Evaluation failed");
            return Err(e.into());
        }

        let node = self.node(node_id)?;
        let result = if node.output_ports().next().is_some() {
            Evaluation::Outputs(node.outputs().clone())
        } else {
            Evaluation::DeadEnd(node.dead_end_values().to_vec())
        };
        tracing::info!(node = %node_id, title = %node.title, ?result, "Evaluation finished");
        Ok(result)
    }

    /// Snapshot a node's fields, outputs and dead-end values without cooking
    pub fn read_values(&self, node_id: NodeId) -> Result<NodeReport, SessionError> {
        self.node(node_id).map(NodeReport::from_node)
    }

    /// Cook a write node and write its captured content to disk
    pub fn execute_write(&mut self, node_id: NodeId) -> Result<PathBuf, SessionError> {
        if self.node(node_id)?.node_type != "write_file" {
            return Err(SessionError::NotWritable(node_id));
        }
        self.graph.cook(node_id)?;
        Ok(output::execute_write(self.node(node_id)?)?)
    }

    fn node(&self, node_id: NodeId) -> Result<&Node, SessionError> {
        self.graph.node(node_id).ok_or(SessionError::NodeNotFound(node_id))
    }
}

/// Error raised by a session operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No registered type with this ID
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node is not a write node
    #[error("Node {0} cannot write files")]
    NotWritable(NodeId),

    /// Wire rejected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Field edit rejected
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Evaluation failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
