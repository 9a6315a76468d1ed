// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and links.
//!
//! The graph is the only place where structure changes. Every mutation
//! keeps three things true: each link is registered on both of its ports,
//! an input port never holds more links than it accepts, and the graph is
//! acyclic. Connection attempts that would break any of these are rejected
//! before anything is modified.

use crate::link::{Link, LinkId};
use crate::node::{FieldError, Node, NodeId, NodeState};
use crate::port::{Port, PortId, PortKind};
use crate::value::DataType;
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Links between nodes, in creation order
    links: IndexMap<LinkId, Link>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        tracing::debug!(node = %id, title = %node.title, "Adding node");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node after disconnecting every link touching it.
    ///
    /// Nodes that were fed by the removed node become dirty; no other node
    /// is removed.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let touching: Vec<LinkId> = self.links_for_node(node_id).map(|l| l.id).collect();
        for link in touching {
            self.disconnect(link);
        }
        tracing::debug!(node = %node_id, "Removing node");
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a port by address
    pub fn port(&self, port: PortId) -> Option<&Port> {
        self.nodes.get(&port.node)?.port(port.row)
    }

    /// Move a node. Returns false if the node does not exist.
    pub fn set_position(&mut self, node_id: NodeId, position: [f32; 2]) -> bool {
        match self.nodes.get_mut(&node_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Edit the text of a field and invalidate the node and its dependents.
    ///
    /// Writing the text a field already holds changes nothing.
    pub fn set_field(&mut self, node_id: NodeId, row: usize, text: &str) -> Result<(), FieldError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(FieldError::NodeNotFound(node_id))?;
        if node.set_field(row, text)? {
            self.mark_dirty(node_id);
        }
        Ok(())
    }

    /// Mark a node dirty along with everything downstream of it.
    ///
    /// Already dirty nodes are skipped: their dependents are dirty too.
    pub fn mark_dirty(&mut self, node_id: NodeId) {
        let mut pending = vec![node_id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if node.is_dirty() {
                continue;
            }
            node.set_state(NodeState::Dirty);
            tracing::debug!(node = %id, title = %node.title, "Marked dirty");
            pending.extend(self.downstream_nodes(id));
        }
    }

    /// Nodes fed by a node's outputs, in output row then link order
    pub fn downstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.output_ports()
            .flat_map(|(_, port)| port.links())
            .filter_map(|id| self.links.get(id))
            .map(Link::downstream)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Nodes feeding a node's inputs, in input row then link order
    pub fn upstream_nodes(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.ports()
            .filter(|(_, port)| port.kind() == PortKind::Input)
            .flat_map(|(_, port)| port.links())
            .filter_map(|id| self.links.get(id))
            .map(Link::upstream)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Put two ports in (output, input) order, if they are of opposite kinds
    pub fn orient(&self, a: PortId, b: PortId) -> Option<(PortId, PortId)> {
        match (self.port(a)?.kind(), self.port(b)?.kind()) {
            (PortKind::Output, PortKind::Input) => Some((a, b)),
            (PortKind::Input, PortKind::Output) => Some((b, a)),
            _ => None,
        }
    }

    /// Check whether linking two ports keeps the graph acyclic.
    ///
    /// The ports may be given in either order. Walks breadth-first from the
    /// input's node along outbound links; reaching the output's node means
    /// the link would close a cycle. Data types are not considered.
    pub fn can_connect(&self, a: PortId, b: PortId) -> bool {
        match self.orient(a, b) {
            Some((output, input)) => !self.reaches(input.node, output.node),
            None => false,
        }
    }

    /// Breadth-first reachability along outbound links
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            for next in self.downstream_nodes(current) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }

    /// Link an output port to an input port.
    ///
    /// A single-link input that is already connected has its old link
    /// replaced. The input's node is marked dirty. On error the graph is
    /// left untouched.
    pub fn connect(&mut self, output: PortId, input: PortId) -> Result<LinkId, ConnectionError> {
        let source = self.port(output).ok_or(ConnectionError::PortNotFound(output))?;
        let target = self.port(input).ok_or(ConnectionError::PortNotFound(input))?;

        if source.kind() != PortKind::Output || target.kind() != PortKind::Input {
            return Err(ConnectionError::TypeMismatch {
                output: source.kind(),
                input: target.kind(),
            });
        }

        if !source.data_type().can_connect_to(&target.data_type()) {
            return Err(ConnectionError::IncompatibleDataType {
                from: source.data_type(),
                to: target.data_type(),
            });
        }

        if target.is_multi_connect()
            && target
                .links()
                .iter()
                .filter_map(|id| self.links.get(id))
                .any(|l| l.output == output)
        {
            return Err(ConnectionError::AlreadyLinked { output, input });
        }

        if self.reaches(input.node, output.node) {
            return Err(ConnectionError::CycleDetected { output, input });
        }

        let replaced = (!target.is_multi_connect())
            .then(|| target.links().first().copied())
            .flatten();
        if let Some(old) = replaced {
            tracing::debug!(link = %old, port = %input, "Replacing existing link");
            self.disconnect(old);
        }

        let link = Link::new(output, input);
        let id = link.id;
        self.links.insert(id, link);
        if let Some(port) = self.nodes.get_mut(&output.node).and_then(|n| n.port_mut(output.row)) {
            port.attach(id);
        }
        if let Some(port) = self.nodes.get_mut(&input.node).and_then(|n| n.port_mut(input.row)) {
            port.attach(id);
        }
        tracing::debug!(link = %id, from = %output, to = %input, "Connected");

        self.mark_dirty(input.node);
        Ok(id)
    }

    /// Link two ports given in either order, as when a wire is dragged from
    /// an input back to an output
    pub fn connect_sockets(&mut self, a: PortId, b: PortId) -> Result<LinkId, ConnectionError> {
        match self.orient(a, b) {
            Some((output, input)) => self.connect(output, input),
            None => self.connect(a, b),
        }
    }

    /// Remove a link from both of its ports and dirty the node it fed
    pub fn disconnect(&mut self, link_id: LinkId) -> Option<Link> {
        let link = self.links.shift_remove(&link_id)?;
        for port in [link.output, link.input] {
            if let Some(port) = self.nodes.get_mut(&port.node).and_then(|n| n.port_mut(port.row)) {
                port.detach(link_id);
            }
        }
        tracing::debug!(link = %link_id, "Disconnected");
        self.mark_dirty(link.downstream());
        Some(link)
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links in creation order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links leaving a specific port
    pub fn links_from(&self, port: PortId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.output == port)
    }

    /// Get links entering a specific port
    pub fn links_to(&self, port: PortId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.input == port)
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// The link feeding a single-link input port
    pub fn upstream_link(&self, input: PortId) -> Option<&Link> {
        let port = self.port(input)?;
        if port.kind() != PortKind::Input {
            return None;
        }
        port.links().first().and_then(|id| self.links.get(id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortId),

    /// Ports are not an output followed by an input
    #[error("Cannot link {output:?} port to {input:?} port")]
    TypeMismatch {
        /// Kind of the port used as the source
        output: PortKind,
        /// Kind of the port used as the target
        input: PortKind,
    },

    /// Declared data types do not allow the link
    #[error("Cannot link {from} output to {to} input")]
    IncompatibleDataType {
        /// Output data type
        from: DataType,
        /// Input data type
        to: DataType,
    },

    /// The link would close a cycle
    #[error("Linking {output} to {input} would create a cycle")]
    CycleDetected {
        /// Output port
        output: PortId,
        /// Input port
        input: PortId,
    },

    /// The output already feeds this multi-input port
    #[error("{output} is already linked to {input}")]
    AlreadyLinked {
        /// Output port
        output: PortId,
        /// Input port
        input: PortId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{from_fn, Inputs, NodeOutput};
    use crate::layout::{NodeCategory, NodeLayout, RowLayout};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const IN: usize = 0;
    const OUT: usize = 1;

    fn relay_with(graph: &mut Graph, input: RowLayout, output: DataType) -> NodeId {
        let layout = NodeLayout::new("relay", "Relay", NodeCategory::Utility)
            .row(input)
            .row(RowLayout::output("Out", output));
        graph.add_node(Node::new(
            &layout,
            from_fn(|inputs: &Inputs| Ok(NodeOutput::new().with(OUT, inputs.get(IN).cloned()))),
        ))
    }

    fn relay(graph: &mut Graph) -> NodeId {
        relay_with(graph, RowLayout::input("In", DataType::Float), DataType::Float)
    }

    fn cook_all(graph: &mut Graph) {
        let ids: Vec<_> = graph.node_ids().collect();
        for id in ids {
            graph.cook(id).unwrap();
        }
    }

    /// Depth-first reachability computed straight from the link table
    fn reachable(graph: &Graph, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(graph.links().filter(|l| l.upstream() == id).map(Link::downstream));
            }
        }
        false
    }

    /// Depth-first topological sort; `None` if the links form a cycle
    fn topological_order(graph: &Graph) -> Option<Vec<NodeId>> {
        fn visit(
            graph: &Graph,
            node_id: NodeId,
            visited: &mut HashSet<NodeId>,
            in_progress: &mut HashSet<NodeId>,
            order: &mut Vec<NodeId>,
        ) -> Option<()> {
            if visited.contains(&node_id) {
                return Some(());
            }
            if !in_progress.insert(node_id) {
                return None;
            }
            for upstream in graph.upstream_nodes(node_id) {
                visit(graph, upstream, visited, in_progress, order)?;
            }
            in_progress.remove(&node_id);
            visited.insert(node_id);
            order.push(node_id);
            Some(())
        }

        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        let mut order = Vec::new();
        for node_id in graph.node_ids() {
            visit(graph, node_id, &mut visited, &mut in_progress, &mut order)?;
        }
        Some(order)
    }

    #[test]
    fn test_connect_registers_both_sides() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let id = graph.connect(PortId::new(a, OUT), PortId::new(b, IN)).unwrap();

        assert_eq!(graph.port(PortId::new(a, OUT)).unwrap().links(), &[id]);
        assert_eq!(graph.port(PortId::new(b, IN)).unwrap().links(), &[id]);
        assert_eq!(graph.upstream_link(PortId::new(b, IN)).map(|l| l.id), Some(id));
        assert_eq!(graph.links_from(PortId::new(a, OUT)).count(), 1);
        assert_eq!(graph.links_to(PortId::new(b, IN)).count(), 1);
    }

    #[test]
    fn test_connect_rejects_same_kind() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);

        let err = graph.connect(PortId::new(a, OUT), PortId::new(b, OUT)).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::TypeMismatch { output: PortKind::Output, input: PortKind::Output }
        );
        assert!(matches!(
            graph.connect(PortId::new(a, IN), PortId::new(b, IN)),
            Err(ConnectionError::TypeMismatch { .. })
        ));
        // reversed order is not oriented by the strict call
        assert!(matches!(
            graph.connect(PortId::new(b, IN), PortId::new(a, OUT)),
            Err(ConnectionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            graph.connect(PortId::new(a, OUT), PortId::new(b, 7)),
            Err(ConnectionError::PortNotFound(_))
        ));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_connect_sockets_orients() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let id = graph.connect_sockets(PortId::new(b, IN), PortId::new(a, OUT)).unwrap();
        let link = graph.link(id).unwrap();
        assert_eq!(link.output, PortId::new(a, OUT));
        assert_eq!(link.input, PortId::new(b, IN));
    }

    #[test]
    fn test_incompatible_data_type() {
        let mut graph = Graph::default();
        let handle_in = RowLayout::input("In", DataType::Opaque);
        let handle = relay_with(&mut graph, handle_in, DataType::Opaque);
        let number = relay(&mut graph);
        let err = graph
            .connect(PortId::new(handle, OUT), PortId::new(number, IN))
            .unwrap_err();
        assert_eq!(
            err,
            ConnectionError::IncompatibleDataType { from: DataType::Opaque, to: DataType::Float }
        );
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_reconnect_replaces() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let c = relay(&mut graph);
        let first = graph.connect(PortId::new(a, OUT), PortId::new(c, IN)).unwrap();
        let second = graph.connect(PortId::new(b, OUT), PortId::new(c, IN)).unwrap();

        assert_eq!(graph.link_count(), 1);
        assert!(graph.link(first).is_none());
        assert_eq!(graph.port(PortId::new(c, IN)).unwrap().links(), &[second]);
        assert!(!graph.port(PortId::new(a, OUT)).unwrap().is_connected());
    }

    #[test]
    fn test_multi_input_accumulates() {
        let mut graph = Graph::default();
        let many = RowLayout::multi_input("In", DataType::Float);
        let sum = relay_with(&mut graph, many, DataType::Float);
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let first = graph.connect(PortId::new(a, OUT), PortId::new(sum, IN)).unwrap();
        let second = graph.connect(PortId::new(b, OUT), PortId::new(sum, IN)).unwrap();

        assert_eq!(graph.port(PortId::new(sum, IN)).unwrap().links(), &[first, second]);
        assert!(matches!(
            graph.connect(PortId::new(a, OUT), PortId::new(sum, IN)),
            Err(ConnectionError::AlreadyLinked { .. })
        ));
        assert_eq!(graph.upstream_nodes(sum), vec![a, b]);
    }

    #[test]
    fn test_cycle_rejected_without_mutation() {
        let mut graph = Graph::default();
        let c = relay(&mut graph);
        let d = relay(&mut graph);
        let e = relay(&mut graph);
        graph.connect(PortId::new(c, OUT), PortId::new(d, IN)).unwrap();
        graph.connect(PortId::new(d, OUT), PortId::new(e, IN)).unwrap();
        cook_all(&mut graph);

        assert!(!graph.can_connect(PortId::new(e, OUT), PortId::new(c, IN)));
        let err = graph.connect(PortId::new(e, OUT), PortId::new(c, IN)).unwrap_err();
        assert!(matches!(err, ConnectionError::CycleDetected { .. }));
        assert_eq!(graph.link_count(), 2);
        assert!(!graph.port(PortId::new(c, IN)).unwrap().is_connected());
        assert!(graph.nodes().all(|n| !n.is_dirty()));
    }

    #[test]
    fn test_self_link_is_a_cycle() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        assert!(!graph.can_connect(PortId::new(a, IN), PortId::new(a, OUT)));
        assert!(matches!(
            graph.connect(PortId::new(a, OUT), PortId::new(a, IN)),
            Err(ConnectionError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_can_connect_matches_reachability() {
        let mut rng = StdRng::seed_from_u64(0x6e6c_6470);
        for _ in 0..25 {
            let mut graph = Graph::default();
            let nodes: Vec<NodeId> = (0..8).map(|_| relay(&mut graph)).collect();

            for _ in 0..24 {
                let from = nodes[rng.random_range(0..nodes.len())];
                let to = nodes[rng.random_range(0..nodes.len())];
                let acyclic = !reachable(&graph, to, from);

                assert_eq!(graph.can_connect(PortId::new(from, OUT), PortId::new(to, IN)), acyclic);
                let links_before = graph.link_count();
                match graph.connect(PortId::new(from, OUT), PortId::new(to, IN)) {
                    Ok(_) => assert!(acyclic),
                    Err(ConnectionError::CycleDetected { .. }) => {
                        assert!(!acyclic);
                        assert_eq!(graph.link_count(), links_before);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }

            let order = topological_order(&graph).unwrap();
            for link in graph.links() {
                let up = order.iter().position(|id| *id == link.upstream());
                let down = order.iter().position(|id| *id == link.downstream());
                assert!(up < down);
            }
        }
    }

    #[test]
    fn test_mark_dirty_closure() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let c = relay(&mut graph);
        let side = relay(&mut graph);
        let upstream = relay(&mut graph);
        graph.connect(PortId::new(upstream, OUT), PortId::new(a, IN)).unwrap();
        graph.connect(PortId::new(a, OUT), PortId::new(b, IN)).unwrap();
        graph.connect(PortId::new(b, OUT), PortId::new(c, IN)).unwrap();
        cook_all(&mut graph);
        assert!(graph.nodes().all(|n| !n.is_dirty()));

        graph.mark_dirty(a);
        for id in [a, b, c] {
            assert!(graph.node(id).unwrap().is_dirty());
        }
        assert!(!graph.node(side).unwrap().is_dirty());
        assert!(!graph.node(upstream).unwrap().is_dirty());
    }

    #[test]
    fn test_connect_and_disconnect_dirty_downstream() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        cook_all(&mut graph);

        let id = graph.connect(PortId::new(a, OUT), PortId::new(b, IN)).unwrap();
        assert!(graph.node(b).unwrap().is_dirty());
        assert!(!graph.node(a).unwrap().is_dirty());

        cook_all(&mut graph);
        let link = graph.disconnect(id).unwrap();
        assert_eq!(link.id, id);
        assert!(graph.node(b).unwrap().is_dirty());
        assert!(!graph.port(PortId::new(a, OUT)).unwrap().is_connected());
        assert!(!graph.port(PortId::new(b, IN)).unwrap().is_connected());
        assert!(graph.disconnect(id).is_none());
    }

    #[test]
    fn test_remove_node_clears_links() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        let b = relay(&mut graph);
        let c = relay(&mut graph);
        graph.connect(PortId::new(a, OUT), PortId::new(b, IN)).unwrap();
        graph.connect(PortId::new(b, OUT), PortId::new(c, IN)).unwrap();
        cook_all(&mut graph);

        let removed = graph.remove_node(b).unwrap();
        assert_eq!(removed.id(), b);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 0);
        assert!(!graph.port(PortId::new(a, OUT)).unwrap().is_connected());
        assert!(!graph.port(PortId::new(c, IN)).unwrap().is_connected());
        assert!(graph.node(c).unwrap().is_dirty());
        assert!(!graph.node(a).unwrap().is_dirty());
    }

    #[test]
    fn test_set_field_errors() {
        let mut graph = Graph::default();
        let a = relay(&mut graph);
        assert!(matches!(graph.set_field(a, OUT, "1"), Err(FieldError::NotEditable { .. })));
        assert!(matches!(
            graph.set_field(NodeId::new(), 0, "1"),
            Err(FieldError::NodeNotFound(_))
        ));
    }
}
