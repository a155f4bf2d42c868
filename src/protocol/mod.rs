// src/protocol/mod.rs

pub mod exchange;
pub mod planner;

use crate::model::StructureKind;
use serde::Serialize;

pub use exchange::{ExchangeState, InteractionProtocol, NO_RESPONSE, Reply, Session};
pub use planner::{CataloguePlanner, Planner, QuestionPlan, SeedPools};

/// Operation label used for the creation question of every kind.
pub const CREATE: &str = "create";

/// Case-sensitive keyword search over an operation label.
pub fn mentions(label: &str, keyword: &str) -> bool {
    label.contains(keyword)
}

/// Case-insensitive keyword search over an operation label.
pub fn mentions_ci(label: &str, keyword: &str) -> bool {
    label.to_lowercase().contains(&keyword.to_lowercase())
}

/// How operands are spelled out at the end of a question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OperandStyle {
    /// `value(s) 4, 8`
    Values,
    /// `between nodes 4 and 8`
    Edge,
    /// `position 2 with value 8` (the value is optional)
    Position,
}

/// One question in the plan. Never modified after it is generated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Question {
    pub kind: StructureKind,
    pub operation: String,
    pub operands: Vec<i64>,
    pub text: String,
}

impl Question {
    pub fn create(kind: StructureKind, seeds: &[i64]) -> Self {
        let listed = join(seeds);
        let text = match kind {
            StructureKind::Graph => format!(
                "Create a graph with the following nodes: {listed}. Then add random edge weights between consecutive nodes."
            ),
            _ => format!("Create a {} with the following values: {listed}.", kind.phrase()),
        };
        Self {
            kind,
            operation: CREATE.into(),
            operands: seeds.to_vec(),
            text,
        }
    }

    pub fn operation(kind: StructureKind, label: &str, operands: Vec<i64>, style: OperandStyle) -> Self {
        let suffix = match (style, operands.as_slice()) {
            (_, []) => String::new(),
            (OperandStyle::Edge, [a, b, ..]) => format!(" between nodes {a} and {b}"),
            (OperandStyle::Position, [p]) => format!(" {p}"),
            (OperandStyle::Position, [p, v, ..]) => format!(" {p} with value {v}"),
            _ => format!(" value(s) {}", join(&operands)),
        };
        Self {
            kind,
            text: format!("For the {} created earlier, {label}{suffix}.", kind.phrase()),
            operation: label.into(),
            operands,
        }
    }

    pub fn is_create(&self) -> bool {
        self.operation == CREATE
    }
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
