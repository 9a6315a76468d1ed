// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (wire) definitions for the graph.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Uuid);

impl LinkId {
    /// Create a new random link ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed edge from one output port to one input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Upstream output port
    pub output: PortId,
    /// Downstream input port
    pub input: PortId,
}

impl Link {
    /// Create a new link
    pub fn new(output: PortId, input: PortId) -> Self {
        Self {
            id: LinkId::new(),
            output,
            input,
        }
    }

    /// Node producing the value
    pub fn upstream(&self) -> NodeId {
        self.output.node
    }

    /// Node consuming the value
    pub fn downstream(&self) -> NodeId {
        self.input.node
    }

    /// Check if this link involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.output.node == node_id || self.input.node == node_id
    }
}
