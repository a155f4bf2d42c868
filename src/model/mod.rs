// src/model/mod.rs

use crate::error::{ProbeError, Result};
use crate::protocol::{mentions, mentions_ci};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// The four data structures the agent is questioned about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Graph,
    Tree,
    LinkedList,
    Queue,
}

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Graph,
        StructureKind::Tree,
        StructureKind::LinkedList,
        StructureKind::Queue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureKind::Graph => "graph",
            StructureKind::Tree => "tree",
            StructureKind::LinkedList => "linked_list",
            StructureKind::Queue => "queue",
        }
    }

    /// How the structure is named inside question text.
    pub fn phrase(&self) -> &'static str {
        match self {
            StructureKind::Graph => "graph",
            StructureKind::Tree => "binary search tree",
            StructureKind::LinkedList => "linked list",
            StructureKind::Queue => "queue",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "graph" => Ok(StructureKind::Graph),
            "tree" | "bst" | "binary_search_tree" => Ok(StructureKind::Tree),
            "linked_list" | "linkedlist" | "list" => Ok(StructureKind::LinkedList),
            "queue" => Ok(StructureKind::Queue),
            other => Err(format!("unknown structure kind: {other}")),
        }
    }
}

/// Undirected edge, stored with the smaller endpoint first so `(a, b)` and
/// `(b, a)` compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(i64, i64);

impl Edge {
    pub fn new(a: i64, b: i64) -> Self {
        if a <= b { Edge(a, b) } else { Edge(b, a) }
    }

    pub fn ends(&self) -> (i64, i64) {
        (self.0, self.1)
    }

    pub fn touches(&self, node: i64) -> bool {
        self.0 == node || self.1 == node
    }
}

/// Expected state of one structure, as established at creation.
#[derive(Clone, Debug, PartialEq)]
pub enum Baseline {
    Graph {
        nodes: BTreeSet<i64>,
        edges: BTreeSet<Edge>,
    },
    Tree {
        nodes: BTreeSet<i64>,
        root: Option<i64>,
    },
    LinkedList {
        values: Vec<i64>,
    },
    Queue {
        values: VecDeque<i64>,
    },
}

impl Baseline {
    /// Builds the creation-time state. Graphs get an edge between each pair of
    /// consecutive seed values.
    pub fn seeded(kind: StructureKind, seeds: &[i64]) -> Self {
        match kind {
            StructureKind::Graph => Baseline::Graph {
                nodes: seeds.iter().copied().collect(),
                edges: seeds.windows(2).map(|w| Edge::new(w[0], w[1])).collect(),
            },
            StructureKind::Tree => Baseline::Tree {
                nodes: seeds.iter().copied().collect(),
                root: seeds.first().copied(),
            },
            StructureKind::LinkedList => Baseline::LinkedList {
                values: seeds.to_vec(),
            },
            StructureKind::Queue => Baseline::Queue {
                values: seeds.iter().copied().collect(),
            },
        }
    }

    pub fn kind(&self) -> StructureKind {
        match self {
            Baseline::Graph { .. } => StructureKind::Graph,
            Baseline::Tree { .. } => StructureKind::Tree,
            Baseline::LinkedList { .. } => StructureKind::LinkedList,
            Baseline::Queue { .. } => StructureKind::Queue,
        }
    }

    /// Node set for graphs and trees, the sequence in order for lists and queues.
    pub fn values(&self) -> Vec<i64> {
        match self {
            Baseline::Graph { nodes, .. } | Baseline::Tree { nodes, .. } => {
                nodes.iter().copied().collect()
            }
            Baseline::LinkedList { values } => values.clone(),
            Baseline::Queue { values } => values.iter().copied().collect(),
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        match self {
            Baseline::Graph { nodes, .. } | Baseline::Tree { nodes, .. } => nodes.contains(&value),
            Baseline::LinkedList { values } => values.contains(&value),
            Baseline::Queue { values } => values.contains(&value),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Baseline::Graph { nodes, .. } | Baseline::Tree { nodes, .. } => nodes.len(),
            Baseline::LinkedList { values } => values.len(),
            Baseline::Queue { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies the effect of an accepted operation. Labels are matched the same
    /// way the validator matches them; anything unrecognised leaves the state as is.
    pub fn apply(&mut self, operation: &str, operands: &[i64]) {
        match self {
            Baseline::Graph { nodes, edges } => {
                if mentions(operation, "Insert") {
                    match operands {
                        [a, b, ..] if a != b && nodes.contains(a) && nodes.contains(b) => {
                            edges.insert(Edge::new(*a, *b));
                        }
                        [v] => {
                            nodes.insert(*v);
                        }
                        _ => {}
                    }
                } else if mentions(operation, "Delete") {
                    if let Some(v) = operands.first() {
                        if nodes.remove(v) {
                            edges.retain(|e| !e.touches(*v));
                        }
                    }
                }
            }
            Baseline::Tree { nodes, root } => {
                let Some(&v) = operands.first() else { return };
                if mentions(operation, "Insert") {
                    nodes.insert(v);
                    root.get_or_insert(v);
                } else if mentions(operation, "Delete") && nodes.remove(&v) && *root == Some(v) {
                    // successor takes the root's place, predecessor if there is none
                    *root = nodes
                        .range(v..)
                        .next()
                        .or_else(|| nodes.range(..v).next_back())
                        .copied();
                }
            }
            Baseline::LinkedList { values } => apply_list(values, operation, operands),
            Baseline::Queue { values } => {
                if mentions(operation, "Dequeue") {
                    values.pop_front();
                } else if mentions(operation, "Enqueue") {
                    values.extend(operands.iter().copied());
                }
            }
        }
    }
}

fn apply_list(values: &mut Vec<i64>, operation: &str, operands: &[i64]) {
    let at = |p: i64, len: usize| usize::try_from(p).ok().filter(|p| *p < len);

    if mentions(operation, "Insert") {
        if mentions_ci(operation, "position") {
            if let [p, v, ..] = operands {
                if let Some(p) = at(*p, values.len()) {
                    values.insert(p, *v);
                }
            }
        } else if let Some(&v) = operands.first() {
            if mentions_ci(operation, "beginning") {
                values.insert(0, v);
            } else {
                values.push(v);
            }
        }
    } else if mentions(operation, "Delete") {
        if mentions_ci(operation, "position") {
            if let Some(p) = operands.first().and_then(|p| at(*p, values.len())) {
                values.remove(p);
            }
        } else if mentions_ci(operation, "beginning") {
            if !values.is_empty() {
                values.remove(0);
            }
        } else if mentions_ci(operation, "end") {
            values.pop();
        } else if let Some(v) = operands.first() {
            if let Some(idx) = values.iter().position(|x| x == v) {
                values.remove(idx);
            }
        }
    } else if mentions(operation, "Update") && mentions_ci(operation, "position") {
        if let [p, v, ..] = operands {
            if let Some(p) = at(*p, values.len()) {
                values[p] = *v;
            }
        }
    }
}

/// Whether accepted operations are folded back into the expected state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// The creation-time snapshot is the only ground truth for the whole run.
    #[default]
    Fixed,
    /// Each passed operation updates the model before the next validation.
    Live,
}

/// Expected state per structure kind.
#[derive(Debug, Default)]
pub struct ExpectedStateTracker {
    baselines: HashMap<StructureKind, Baseline>,
    mode: TrackingMode,
}

impl ExpectedStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: TrackingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Seeds the baseline for `kind`. A second call for the same kind replaces
    /// the first.
    pub fn initialize(&mut self, kind: StructureKind, seeds: &[i64]) -> Result<()> {
        if seeds.is_empty() {
            return Err(ProbeError::InvalidSeed {
                kind,
                reason: "no values".into(),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = seeds.iter().find(|v| !seen.insert(**v)) {
            return Err(ProbeError::InvalidSeed {
                kind,
                reason: format!("duplicate value {dup}"),
            });
        }

        self.baselines.insert(kind, Baseline::seeded(kind, seeds));
        Ok(())
    }

    pub fn snapshot(&self, kind: StructureKind) -> Result<&Baseline> {
        self.baselines
            .get(&kind)
            .ok_or(ProbeError::NotInitialized(kind))
    }

    pub fn is_initialized(&self, kind: StructureKind) -> bool {
        self.baselines.contains_key(&kind)
    }

    /// Records an accepted operation. A no-op in [`TrackingMode::Fixed`]; in
    /// [`TrackingMode::Live`] the effect is applied to a copy which then replaces
    /// the stored state.
    pub fn commit(&mut self, kind: StructureKind, operation: &str, operands: &[i64]) -> Result<()> {
        if self.mode == TrackingMode::Fixed {
            return Ok(());
        }
        let mut next = self.snapshot(kind)?.clone();
        next.apply(operation, operands);
        self.baselines.insert(kind, next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn snapshot_matches_seed_set(
            seeds in prop::collection::btree_set(1i64..100, 1..10),
            kind_idx in 0usize..4,
        ) {
            let kind = StructureKind::ALL[kind_idx];
            let seeds: Vec<i64> = seeds.into_iter().collect();
            let mut tracker = ExpectedStateTracker::new();
            tracker.initialize(kind, &seeds).unwrap();

            let snapshot = tracker.snapshot(kind).unwrap();
            let mut got = snapshot.values();
            got.sort();
            prop_assert_eq!(got, seeds.clone());
            prop_assert_eq!(snapshot.len(), seeds.len());
        }
    }

    #[test]
    fn unseeded_kind_is_not_initialized() {
        let tracker = ExpectedStateTracker::new();
        assert!(matches!(
            tracker.snapshot(StructureKind::Tree),
            Err(ProbeError::NotInitialized(StructureKind::Tree))
        ));
    }

    #[test]
    fn second_initialize_replaces_first() {
        let mut tracker = ExpectedStateTracker::new();
        tracker.initialize(StructureKind::Queue, &[1, 2, 3]).unwrap();
        tracker.initialize(StructureKind::Queue, &[9]).unwrap();
        assert_eq!(tracker.snapshot(StructureKind::Queue).unwrap().values(), vec![9]);
    }

    #[test]
    fn rejects_empty_and_duplicate_seeds() {
        let mut tracker = ExpectedStateTracker::new();
        assert!(tracker.initialize(StructureKind::Graph, &[]).is_err());
        assert!(tracker.initialize(StructureKind::Graph, &[4, 7, 4]).is_err());
        assert!(!tracker.is_initialized(StructureKind::Graph));
    }

    #[test]
    fn graph_seed_links_consecutive_values() {
        let Baseline::Graph { edges, .. } = Baseline::seeded(StructureKind::Graph, &[3, 9, 1])
        else {
            panic!("expected graph");
        };
        assert!(edges.contains(&Edge::new(9, 3)));
        assert!(edges.contains(&Edge::new(1, 9)));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn tree_root_is_first_seed() {
        let mut tracker = ExpectedStateTracker::new();
        tracker.initialize(StructureKind::Tree, &[50, 20, 80]).unwrap();
        match tracker.snapshot(StructureKind::Tree).unwrap() {
            Baseline::Tree { root, .. } => assert_eq!(*root, Some(50)),
            other => panic!("unexpected baseline {other:?}"),
        }
    }

    #[test]
    fn fixed_mode_ignores_commits() {
        let mut tracker = ExpectedStateTracker::new();
        tracker.initialize(StructureKind::Queue, &[5, 12]).unwrap();
        tracker.commit(StructureKind::Queue, "Dequeue", &[]).unwrap();
        assert_eq!(tracker.snapshot(StructureKind::Queue).unwrap().len(), 2);
    }

    #[test]
    fn live_mode_tracks_queue_and_list() {
        let mut tracker = ExpectedStateTracker::new().with_mode(TrackingMode::Live);
        tracker.initialize(StructureKind::Queue, &[5, 12]).unwrap();
        tracker.commit(StructureKind::Queue, "Enqueue", &[99]).unwrap();
        tracker.commit(StructureKind::Queue, "Dequeue", &[]).unwrap();
        assert_eq!(tracker.snapshot(StructureKind::Queue).unwrap().values(), vec![12, 99]);

        tracker.initialize(StructureKind::LinkedList, &[1, 2, 3]).unwrap();
        tracker.commit(StructureKind::LinkedList, "Insert at beginning", &[7]).unwrap();
        tracker.commit(StructureKind::LinkedList, "Update at position", &[1, 8]).unwrap();
        tracker.commit(StructureKind::LinkedList, "Delete from end", &[]).unwrap();
        tracker.commit(StructureKind::LinkedList, "Insert at position", &[10, 4]).unwrap();
        assert_eq!(
            tracker.snapshot(StructureKind::LinkedList).unwrap().values(),
            vec![7, 8, 2]
        );
    }

    #[test]
    fn live_graph_delete_drops_incident_edges() {
        let mut tracker = ExpectedStateTracker::new().with_mode(TrackingMode::Live);
        tracker.initialize(StructureKind::Graph, &[1, 2, 3]).unwrap();
        tracker.commit(StructureKind::Graph, "Delete node", &[2]).unwrap();
        match tracker.snapshot(StructureKind::Graph).unwrap() {
            Baseline::Graph { nodes, edges } => {
                assert!(!nodes.contains(&2));
                assert!(edges.is_empty());
            }
            other => panic!("unexpected baseline {other:?}"),
        }
    }

    #[test]
    fn live_tree_root_moves_to_successor() {
        let mut tracker = ExpectedStateTracker::new().with_mode(TrackingMode::Live);
        tracker.initialize(StructureKind::Tree, &[50, 20, 80]).unwrap();
        tracker.commit(StructureKind::Tree, "Delete", &[50]).unwrap();
        match tracker.snapshot(StructureKind::Tree).unwrap() {
            Baseline::Tree { root, nodes } => {
                assert_eq!(*root, Some(80));
                assert_eq!(nodes.len(), 2);
            }
            other => panic!("unexpected baseline {other:?}"),
        }
    }

    #[test]
    fn kind_parses_common_spellings() {
        assert_eq!("linked-list".parse::<StructureKind>(), Ok(StructureKind::LinkedList));
        assert_eq!("BST".parse::<StructureKind>(), Ok(StructureKind::Tree));
        assert!("heap".parse::<StructureKind>().is_err());
    }
}
