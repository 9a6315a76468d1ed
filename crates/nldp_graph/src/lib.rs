// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph evaluation engine for the NLDP editor.
//!
//! Nodes are built from declarative layouts and wired output-to-input into a
//! directed acyclic graph. Evaluation is pull-based: cooking a node cooks its
//! upstream nodes first, and clean nodes reuse their cached outputs until an
//! edit or rewire marks them dirty.
//!
//! ## Architecture
//!
//! - [`layout`]: declarative node layouts and their RON form
//! - [`graph`]: node/link arena, wiring rules and dirty propagation
//! - [`evaluation`]: the cook loop and the [`NodeEvaluator`] seam
//! - [`registry`] and [`standard`]: node types available to spawn
//! - [`session`]: the editing surface a canvas UI drives

pub mod evaluation;
pub mod graph;
pub mod layout;
pub mod link;
pub mod node;
pub mod port;
pub mod registry;
pub mod session;
pub mod standard;
pub mod value;

pub use evaluation::{from_fn, EvaluationError, Inputs, NodeEvaluator, NodeOutput};
pub use graph::{ConnectionError, Graph};
pub use layout::{FieldRole, LayoutError, NodeCategory, NodeLayout, RowLayout, WidgetKind};
pub use link::{Link, LinkId};
pub use node::{FieldError, Node, NodeId, NodeState};
pub use port::{Port, PortId, PortKind};
pub use registry::{NodeRegistry, NodeType};
pub use session::{EditorSession, Evaluation, NodeReport, SessionError};
pub use value::{DataType, Value};
