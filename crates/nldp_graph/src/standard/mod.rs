// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard node library: constants, files, math and sinks.

pub mod input;
pub mod math;
pub mod output;

use crate::registry::NodeRegistry;

/// Create a registry holding every standard node type
pub fn create_standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    input::register(&mut registry);
    math::register(&mut registry);
    output::register(&mut registry);
    registry
}
