// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node types: a layout paired with its evaluation strategy.

use crate::evaluation::NodeEvaluator;
use crate::layout::{LayoutError, NodeCategory, NodeLayout};
use crate::node::Node;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Node type definition
#[derive(Clone)]
pub struct NodeType {
    /// Row schema
    pub layout: NodeLayout,
    /// Evaluation strategy shared by every instance
    pub evaluator: Arc<dyn NodeEvaluator>,
}

impl NodeType {
    /// Pair a layout with an evaluator
    pub fn new(layout: NodeLayout, evaluator: Arc<dyn NodeEvaluator>) -> Self {
        Self { layout, evaluator }
    }

    /// Unique type identifier
    pub fn id(&self) -> &str {
        &self.layout.type_id
    }

    /// Create a fresh, dirty node of this type
    pub fn instantiate(&self) -> Node {
        Node::new(&self.layout, Arc::clone(&self.evaluator))
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Registry of available node types
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id().to_string(), node_type);
    }

    /// Validate a designer-supplied layout and register it
    pub fn register_layout(
        &mut self,
        layout: NodeLayout,
        evaluator: Arc<dyn NodeEvaluator>,
    ) -> Result<(), LayoutError> {
        layout.validate()?;
        self.register(NodeType::new(layout, evaluator));
        Ok(())
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Whether a type is registered
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.layout.category == category)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(NodeType::instantiate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{from_fn, Inputs, NodeOutput};
    use crate::layout::RowLayout;
    use crate::value::DataType;

    fn noop() -> Arc<dyn NodeEvaluator> {
        from_fn(|_: &Inputs| Ok(NodeOutput::new()))
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeRegistry::new();
        let layout = NodeLayout::new("const", "Const", NodeCategory::Input)
            .row(RowLayout::output("Out", DataType::Float));
        registry.register_layout(layout, noop()).unwrap();

        assert!(registry.contains("const"));
        assert_eq!(registry.types_in_category(NodeCategory::Input).count(), 1);
        assert_eq!(registry.types_in_category(NodeCategory::Math).count(), 0);

        let a = registry.create_node("const").unwrap();
        let b = registry.create_node("const").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.node_type, "const");
        assert!(a.is_dirty());
        assert!(registry.create_node("missing").is_none());
    }

    #[test]
    fn test_register_layout_validates() {
        let mut registry = NodeRegistry::new();
        let layout = NodeLayout::new("empty", "Empty", NodeCategory::Custom);
        assert!(registry.register_layout(layout, noop()).is_err());
        assert!(registry.is_empty());
    }
}
