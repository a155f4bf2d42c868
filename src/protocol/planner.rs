// src/protocol/planner.rs

use crate::model::StructureKind;
use crate::protocol::{OperandStyle, Question};
use rand::RngCore;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Values are drawn from `1..VALUE_CEILING`.
pub const VALUE_CEILING: i64 = 100;

/// Disjoint value pools: one per structure kind plus one that none of them contain.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedPools {
    per_kind: BTreeMap<StructureKind, Vec<i64>>,
    missing: Vec<i64>,
}

impl SeedPools {
    /// Shuffles `1..100` and deals out five pools of `size` values each.
    pub fn generate(rng: &mut dyn RngCore, size: usize) -> Self {
        let size = size.clamp(1, (VALUE_CEILING as usize - 1) / 5);
        let mut all: Vec<i64> = (1..VALUE_CEILING).collect();
        all.shuffle(rng);

        let mut chunks = all.chunks(size);
        let per_kind = StructureKind::ALL
            .iter()
            .map(|kind| (*kind, chunks.next().map(<[i64]>::to_vec).unwrap_or_default()))
            .collect();
        let missing = chunks.next().map(<[i64]>::to_vec).unwrap_or_default();

        Self { per_kind, missing }
    }

    pub fn from_parts(per_kind: BTreeMap<StructureKind, Vec<i64>>, missing: Vec<i64>) -> Self {
        Self { per_kind, missing }
    }

    pub fn seeds(&self, kind: StructureKind) -> &[i64] {
        self.per_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values guaranteed absent from every seeded structure.
    pub fn missing(&self) -> &[i64] {
        &self.missing
    }
}

/// Ordered questions: every creation question first, then the operations.
#[derive(Clone, Debug)]
pub struct QuestionPlan {
    pub questions: Vec<Question>,
}

impl QuestionPlan {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

/// Produces a question plan from seed pools.
pub trait Planner {
    fn generate_plan(
        &self,
        pools: &SeedPools,
        kinds: &[StructureKind],
        rng: &mut dyn RngCore,
    ) -> QuestionPlan;
}

/// Fixed catalogue of operations per kind, operands drawn at random from the
/// existing and missing pools.
#[derive(Debug, Default)]
pub struct CataloguePlanner;

impl Planner for CataloguePlanner {
    fn generate_plan(
        &self,
        pools: &SeedPools,
        kinds: &[StructureKind],
        rng: &mut dyn RngCore,
    ) -> QuestionPlan {
        let mut questions: Vec<Question> = kinds
            .iter()
            .map(|kind| Question::create(*kind, pools.seeds(*kind)))
            .collect();

        for kind in kinds {
            questions.extend(operations(*kind, pools, rng));
        }

        QuestionPlan { questions }
    }
}

fn pick(pool: &[i64], rng: &mut dyn RngCore) -> Option<i64> {
    pool.choose(rng).copied()
}

fn operations(kind: StructureKind, pools: &SeedPools, rng: &mut dyn RngCore) -> Vec<Question> {
    use OperandStyle::*;

    let seeds = pools.seeds(kind);
    let existing = pick(seeds, rng);
    let missing = pick(pools.missing(), rng);
    let mut out = Vec::new();
    let mut push = |label: &str, operands: Option<Vec<i64>>, style: OperandStyle| {
        if let Some(operands) = operands {
            out.push(Question::operation(kind, label, operands, style));
        }
    };

    match kind {
        StructureKind::Graph => {
            let pair: Vec<i64> = seeds.choose_multiple(rng, 2).copied().collect();
            let pair = (pair.len() == 2).then_some(pair);
            push("Insert edge", pair.clone(), Edge);
            push("Insert edge", existing.map(|v| vec![v, v]), Edge);
            push("Delete node", existing.map(|v| vec![v]), Values);
            push("Delete node", missing.map(|v| vec![v]), Values);
            push("Check path", pair, Edge);
        }
        StructureKind::Tree => {
            push("Insert", missing.map(|v| vec![v]), Values);
            push("Insert", existing.map(|v| vec![v]), Values);
            push("Delete", existing.map(|v| vec![v]), Values);
            push("Delete", missing.map(|v| vec![v]), Values);
            push("Search", existing.map(|v| vec![v]), Values);
            push("Search", missing.map(|v| vec![v]), Values);
        }
        StructureKind::LinkedList => {
            let len = seeds.len() as i64;
            let inside = (rng.next_u32() as i64) % len.max(1);
            let outside = len + (rng.next_u32() as i64) % 5;
            push("Insert at beginning", missing.map(|v| vec![v]), Values);
            push("Insert at end", missing.map(|v| vec![v]), Values);
            push("Insert at position", missing.map(|v| vec![inside, v]), Position);
            push("Insert at position", missing.map(|v| vec![outside, v]), Position);
            push("Delete from beginning", Some(vec![]), Values);
            push("Delete from end", Some(vec![]), Values);
            push("Delete value", existing.map(|v| vec![v]), Values);
            push("Delete at position", Some(vec![outside]), Position);
            push("Update at position", missing.map(|v| vec![inside, v]), Position);
            push("Search value", existing.map(|v| vec![v]), Values);
        }
        StructureKind::Queue => {
            push("Enqueue", missing.map(|v| vec![v]), Values);
            push("Dequeue", Some(vec![]), Values);
            push("Check if empty", Some(vec![]), Values);
            push("Display queue", Some(vec![]), Values);
            push("Check if value exists", existing.map(|v| vec![v]), Values);
            push("Get front", Some(vec![]), Values);
        }
    }

    out
}
