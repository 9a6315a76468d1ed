// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port (socket) definitions for node inputs/outputs.

use crate::link::LinkId;
use crate::node::NodeId;
use crate::value::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a port: the owning node and the layout row it sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId {
    /// Owning node
    pub node: NodeId,
    /// Layout row index
    pub row: usize,
}

impl PortId {
    /// Create a port address
    pub fn new(node: NodeId, row: usize) -> Self {
        Self { node, row }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.row)
    }
}

/// Port kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// A connection point owned by a node.
///
/// Ports only record the ids of the links touching them; the links
/// themselves live in the graph.
#[derive(Debug, Clone)]
pub struct Port {
    kind: PortKind,
    data_type: DataType,
    multi_connect: bool,
    links: Vec<LinkId>,
}

impl Port {
    /// Create a new input port accepting at most one link
    pub fn input(data_type: DataType) -> Self {
        Self {
            kind: PortKind::Input,
            data_type,
            multi_connect: false,
            links: Vec::new(),
        }
    }

    /// Create a new input port aggregating any number of links
    pub fn multi_input(data_type: DataType) -> Self {
        Self {
            multi_connect: true,
            ..Self::input(data_type)
        }
    }

    /// Create a new output port
    pub fn output(data_type: DataType) -> Self {
        Self {
            kind: PortKind::Output,
            data_type,
            multi_connect: true, // Outputs fan out freely
            links: Vec::new(),
        }
    }

    /// Port kind
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether more than one link may be attached
    pub fn is_multi_connect(&self) -> bool {
        self.multi_connect
    }

    /// Attached links in creation order
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Whether any link is attached
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    /// Check if a link from this port into `other` is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        self.kind == PortKind::Output
            && other.kind == PortKind::Input
            && self.data_type.can_connect_to(&other.data_type)
    }

    pub(crate) fn attach(&mut self, link: LinkId) {
        self.links.push(link);
    }

    pub(crate) fn detach(&mut self, link: LinkId) {
        self.links.retain(|l| *l != link);
    }
}
