// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation: pull-based cooking of dirty nodes.
//!
//! Cooking a node first cooks every node wired into its inputs, then gathers
//! and coerces the input values, runs the node's [`NodeEvaluator`] and caches
//! the outputs. Evaluation order falls out of demand; there is no global
//! schedule. Termination relies on the graph staying acyclic, which
//! [`Graph::connect`] enforces.

use crate::graph::Graph;
use crate::layout::FieldRole;
use crate::link::LinkId;
use crate::node::NodeId;
use crate::port::Port;
use crate::value::{CoercionError, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Gathered value for one input row
#[derive(Debug, Clone, PartialEq)]
pub enum InputSlot {
    /// Single-link or local value; absent when unset or uncoercible
    Single(Option<Value>),
    /// Values of a multi-input row in link creation order
    Multi(Vec<Value>),
}

/// Input values handed to an evaluator, keyed by row index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    slots: IndexMap<usize, InputSlot>,
}

impl Inputs {
    /// Create an empty input set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value
    pub fn with(mut self, row: usize, value: impl Into<Option<Value>>) -> Self {
        self.slots.insert(row, InputSlot::Single(value.into()));
        self
    }

    /// Set the values of a multi-input row
    pub fn with_many(mut self, row: usize, values: Vec<Value>) -> Self {
        self.slots.insert(row, InputSlot::Multi(values));
        self
    }

    /// Get the slot for a row
    pub fn slot(&self, row: usize) -> Option<&InputSlot> {
        self.slots.get(&row)
    }

    /// Get the value of a single-valued row
    pub fn get(&self, row: usize) -> Option<&Value> {
        match self.slots.get(&row)? {
            InputSlot::Single(value) => value.as_ref(),
            InputSlot::Multi(_) => None,
        }
    }

    /// All values of a row; a single value yields a one-element slice
    pub fn values(&self, row: usize) -> &[Value] {
        match self.slots.get(&row) {
            Some(InputSlot::Multi(values)) => values,
            Some(InputSlot::Single(Some(value))) => std::slice::from_ref(value),
            _ => &[],
        }
    }

    /// Get a value or fail with [`EvaluationError::MissingInput`]
    pub fn require(&self, row: usize) -> Result<&Value, EvaluationError> {
        self.get(row).ok_or(EvaluationError::MissingInput(row))
    }

    /// Numeric value of a row
    pub fn float(&self, row: usize) -> Option<f64> {
        self.get(row).and_then(Value::as_float)
    }

    /// Integer value of a row
    pub fn integer(&self, row: usize) -> Option<i64> {
        self.get(row).and_then(Value::as_integer)
    }

    /// Text value of a row
    pub fn text(&self, row: usize) -> Option<&str> {
        self.get(row).and_then(Value::as_str)
    }

    /// Path value of a row
    pub fn path(&self, row: usize) -> Option<&Path> {
        self.get(row).and_then(Value::as_path)
    }

    /// Iterate over all slots in row order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &InputSlot)> {
        self.slots.iter().map(|(row, slot)| (*row, slot))
    }

    /// Number of gathered rows
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no rows were gathered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of evaluating a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutput {
    /// Output values by row index
    pub values: IndexMap<usize, Value>,
    /// Terminal values captured by sink nodes
    pub dead_end: Vec<Option<Value>>,
}

impl NodeOutput {
    /// Create a new empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output value
    pub fn set(&mut self, row: usize, value: Value) {
        self.values.insert(row, value);
    }

    /// Set an output value if present
    pub fn with(mut self, row: usize, value: impl Into<Option<Value>>) -> Self {
        if let Some(value) = value.into() {
            self.values.insert(row, value);
        }
        self
    }

    /// Set the terminal values
    pub fn with_dead_end(mut self, values: Vec<Option<Value>>) -> Self {
        self.dead_end = values;
        self
    }

    /// Get an output value
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(&row)
    }
}

/// Evaluation strategy attached to a node type
pub trait NodeEvaluator: Send + Sync {
    /// Compute outputs from gathered inputs
    fn evaluate(&self, inputs: &Inputs) -> Result<NodeOutput, EvaluationError>;
}

impl<F> NodeEvaluator for F
where
    F: Fn(&Inputs) -> Result<NodeOutput, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, inputs: &Inputs) -> Result<NodeOutput, EvaluationError> {
        self(inputs)
    }
}

/// Wrap a closure as a shareable evaluator
pub fn from_fn<F>(f: F) -> Arc<dyn NodeEvaluator>
where
    F: Fn(&Inputs) -> Result<NodeOutput, EvaluationError> + Send + Sync + 'static,
{
    Arc::new(f)
}

impl Graph {
    /// Bring a node's outputs up to date.
    ///
    /// A clean node is left untouched. On error the failing node and
    /// everything downstream of it stay dirty, so the call can be retried.
    pub fn cook(&mut self, node_id: NodeId) -> Result<(), EvaluationError> {
        let node = self.node(node_id).ok_or(EvaluationError::NodeNotFound(node_id))?;
        if !node.is_dirty() {
            return Ok(());
        }

        for upstream in self.upstream_nodes(node_id) {
            self.cook(upstream)?;
        }

        let inputs = self.gather_inputs(node_id)?;
        let node = self.node(node_id).ok_or(EvaluationError::NodeNotFound(node_id))?;
        let evaluator = Arc::clone(node.evaluator());
        tracing::debug!(
            node = %node_id,
            title = %node.title,
            inputs = inputs.len(),
            "Cooking node"
        );

        let output = evaluator.evaluate(&inputs).map_err(|source| EvaluationError::NodeFailed {
            node: node_id,
            title: node.title.clone(),
            source: Box::new(source),
        })?;

        if let Some(node) = self.node_mut(node_id) {
            node.store(output);
        }
        Ok(())
    }

    /// Gather and coerce the input values of a node from current state.
    ///
    /// Linked rows read the upstream node's cached output as is; call
    /// [`Graph::cook`] for fresh values.
    pub fn gather_inputs(&self, node_id: NodeId) -> Result<Inputs, EvaluationError> {
        let node = self.node(node_id).ok_or(EvaluationError::NodeNotFound(node_id))?;
        let mut inputs = Inputs::new();

        for (row, field) in node.rows().iter().enumerate() {
            let data_type = field.layout().data_type;
            let links = field.port().map(Port::links).unwrap_or_default();
            let local = || {
                field
                    .value()
                    .and_then(|text| coerced(node_id, row, data_type.coerce_text(text)))
            };

            let slot = match field.role() {
                FieldRole::Output => continue,
                FieldRole::Static => InputSlot::Single(local()),
                FieldRole::Input | FieldRole::Dynamic => match links.first() {
                    Some(link) => InputSlot::Single(
                        self.linked_value(*link)
                            .and_then(|value| coerced(node_id, row, data_type.coerce(value))),
                    ),
                    None => InputSlot::Single(local()),
                },
                FieldRole::MultiInput => InputSlot::Multi(
                    links
                        .iter()
                        .filter_map(|link| self.linked_value(*link))
                        .filter_map(|value| coerced(node_id, row, data_type.coerce(value)))
                        .collect(),
                ),
            };
            inputs.slots.insert(row, slot);
        }

        Ok(inputs)
    }

    fn linked_value(&self, link: LinkId) -> Option<Value> {
        let link = self.link(link)?;
        self.node(link.upstream())?.output(link.output.row).cloned()
    }
}

fn coerced(node: NodeId, row: usize, result: Result<Value, CoercionError>) -> Option<Value> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(%node, row, %error, "Input coercion failed, treating as absent");
            None
        }
    }
}

/// Error during evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node's evaluator failed
    #[error("Node '{title}' ({node}) failed: {source}")]
    NodeFailed {
        /// Failing node
        node: NodeId,
        /// Title of the failing node
        title: String,
        /// Error raised by the evaluator
        #[source]
        source: Box<EvaluationError>,
    },

    /// Missing required input
    #[error("Missing required input on row {0}")]
    MissingInput(usize),

    /// File type not handled by the node
    #[error("File type not supported: {}", .0.display())]
    UnsupportedFile(PathBuf),

    /// I/O failure inside an evaluator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl EvaluationError {
    /// Innermost error raised by an evaluator
    pub fn root_cause(&self) -> &EvaluationError {
        match self {
            Self::NodeFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Node whose evaluator failed, if known
    pub fn failed_node(&self) -> Option<NodeId> {
        match self {
            Self::NodeFailed { node, .. } => Some(*node),
            _ => None,
        }
    }
}
