// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math nodes.

use crate::evaluation::{from_fn, Inputs, NodeOutput};
use crate::layout::{NodeCategory, NodeLayout, RowLayout};
use crate::registry::{NodeRegistry, NodeType};
use crate::value::{DataType, Value};

/// Register the math nodes
pub fn register(registry: &mut NodeRegistry) {
    registry.register(binary("add", "Add", "0.0", |a, b| a + b));
    registry.register(binary("multiply", "Multiply", "1.0", |a, b| a * b));

    registry.register(NodeType::new(
        NodeLayout::new("sum", "Sum", NodeCategory::Math)
            .with_description("Sum of every linked value")
            .row(RowLayout::multi_input("Values", DataType::Float))
            .row(RowLayout::output("Output", DataType::Float)),
        from_fn(|inputs: &Inputs| {
            let total: f64 = inputs.values(0).iter().filter_map(Value::as_float).sum();
            Ok(NodeOutput::new().with(1, Value::Float(total)))
        }),
    ));
}

/// Two dynamic float fields combined into one output.
///
/// If either operand is absent the output is left empty.
fn binary(type_id: &str, title: &str, default: &str, op: fn(f64, f64) -> f64) -> NodeType {
    NodeType::new(
        NodeLayout::new(type_id, title, NodeCategory::Math)
            .row(RowLayout::dynamic("Value A", DataType::Float, default))
            .row(RowLayout::dynamic("Value B", DataType::Float, default))
            .row(RowLayout::output("Output", DataType::Float)),
        from_fn(move |inputs: &Inputs| {
            let result = match (inputs.float(0), inputs.float(1)) {
                (Some(a), Some(b)) => Some(Value::Float(op(a, b))),
                _ => {
                    tracing::debug!("Operand missing, leaving output empty");
                    None
                }
            };
            Ok(NodeOutput::new().with(2, result))
        }),
    )
}
