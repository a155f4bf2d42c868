// src/validation/rules.rs

use crate::model::{Baseline, Edge, StructureKind};
use crate::protocol::{mentions, mentions_ci};
use crate::validation::ValidationOutcome;
use crate::validation::extract::Payload;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ERROR: LazyLock<Regex> = LazyLock::new(|| indicator(r"error"));
static NOT_EXIST: LazyLock<Regex> = LazyLock::new(|| indicator(r"(not|n't)[\s_-]*exists?"));
static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| indicator(r"not[\s_-]*found"));
static OUT_OF_BOUNDS: LazyLock<Regex> =
    LazyLock::new(|| indicator(r"out[\s_-]*of[\s_-]*(bounds|range)"));
static EMPTY: LazyLock<Regex> = LazyLock::new(|| indicator(r"empty"));

fn indicator(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).unwrap_or_else(|e| panic!("bad indicator {pattern}: {e}"))
}

/// Keyword searched for in an operation label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpPattern {
    /// Case-sensitive.
    Word(&'static str),
    /// Case-insensitive.
    WordCi(&'static str),
}

impl OpPattern {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            OpPattern::Word(w) => mentions(label, w),
            OpPattern::WordCi(w) => mentions_ci(label, w),
        }
    }
}

/// Predicate applied to a payload once a rule has been selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    GraphInsert,
    GraphDelete,
    GraphPath,
    TreeSearch,
    TreeInsert,
    TreeDelete,
    ListPositional,
    QueueDequeue,
    QueueEnqueue,
    QueueDisplay,
    QueueExists,
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub kind: StructureKind,
    /// The rule applies when any of these match the label.
    pub patterns: Vec<OpPattern>,
    pub check: Check,
}

impl Rule {
    pub fn new(kind: StructureKind, patterns: &[OpPattern], check: Check) -> Self {
        Self {
            kind,
            patterns: patterns.to_vec(),
            check,
        }
    }

    pub fn applies_to(&self, kind: StructureKind, operation: &str) -> bool {
        self.kind == kind && self.patterns.iter().any(|p| p.matches(operation))
    }
}

/// Rules in priority order. The first one that applies decides the outcome.
#[derive(Clone, Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn standard() -> Self {
        use Check::*;
        use OpPattern::*;
        use StructureKind::*;

        Self::empty()
            .with(Rule::new(Graph, &[Word("Insert")], GraphInsert))
            .with(Rule::new(Graph, &[Word("Delete")], GraphDelete))
            .with(Rule::new(Graph, &[Word("Check"), WordCi("path")], GraphPath))
            .with(Rule::new(Tree, &[Word("Search"), Word("Find")], TreeSearch))
            .with(Rule::new(Tree, &[Word("Insert")], TreeInsert))
            .with(Rule::new(Tree, &[Word("Delete")], TreeDelete))
            .with(Rule::new(
                LinkedList,
                &[Word("Insert"), Word("Delete"), Word("Update")],
                ListPositional,
            ))
            .with(Rule::new(Queue, &[Word("Dequeue")], QueueDequeue))
            .with(Rule::new(Queue, &[Word("Enqueue")], QueueEnqueue))
            .with(Rule::new(Queue, &[Word("Display")], QueueDisplay))
            .with(Rule::new(Queue, &[Word("Check"), WordCi("exists")], QueueExists))
    }

    /// Appends a rule with the lowest priority so far.
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn lookup(&self, kind: StructureKind, operation: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.applies_to(kind, operation))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn verdict(passed: bool, pass: &str, fail: &str) -> Option<ValidationOutcome> {
    Some(if passed {
        ValidationOutcome::pass(pass)
    } else {
        ValidationOutcome::fail(fail)
    })
}

fn has_structure(payload: &Payload) -> bool {
    payload.find_key_containing("structure").is_some()
}

impl Check {
    /// `None` when the selected rule places no constraint on this particular
    /// question, e.g. an edge insert where one endpoint is unknown.
    pub fn evaluate(
        &self,
        baseline: &Baseline,
        operation: &str,
        operands: &[i64],
        payload: &Payload,
    ) -> Option<ValidationOutcome> {
        let first = operands.first().copied();

        match self {
            Check::GraphInsert => {
                let [a, b, ..] = operands else { return None };
                if a == b {
                    verdict(ERROR.is_match(payload.text()), "self-loop flagged", "should flag self-loop")
                } else if baseline.contains(*a) && baseline.contains(*b) {
                    verdict(lists_edge(payload, Edge::new(*a, *b)), "edge added", "edge not added")
                } else {
                    None
                }
            }
            Check::GraphDelete => {
                if NOT_EXIST.is_match(payload.text()) {
                    return verdict(true, "correctly handled non-existent target", "");
                }
                verdict(
                    !baseline.contains(first?),
                    "target absent from baseline",
                    "incorrect deletion response",
                )
            }
            Check::GraphPath => verdict(
                payload.has_key("pathExists"),
                "path check reported",
                "missing path check result",
            ),
            Check::TreeSearch => {
                let expected = baseline.contains(first?);
                verdict(
                    claims_found(payload) == expected,
                    "search result consistent",
                    "search result incorrect",
                )
            }
            Check::TreeInsert => {
                if baseline.contains(first?) {
                    verdict(
                        ERROR.is_match(payload.text()),
                        "duplicate flagged",
                        "should indicate duplicate value",
                    )
                } else {
                    verdict(
                        has_structure(payload),
                        "updated structure reported",
                        "missing updated tree structure",
                    )
                }
            }
            Check::TreeDelete => {
                if !baseline.contains(first?) {
                    verdict(
                        NOT_FOUND.is_match(payload.text()),
                        "missing value reported",
                        "should indicate non-existent value",
                    )
                } else {
                    verdict(
                        has_structure(payload),
                        "updated structure reported",
                        "missing updated tree structure",
                    )
                }
            }
            Check::ListPositional => {
                let out_of_bounds = mentions_ci(operation, "position")
                    && first.is_some_and(|p| usize::try_from(p).map_or(true, |p| p >= baseline.len()));
                if out_of_bounds {
                    verdict(
                        OUT_OF_BOUNDS.is_match(payload.text()),
                        "out of bounds reported",
                        "should indicate out of bounds",
                    )
                } else {
                    verdict(
                        has_structure(payload),
                        "updated structure reported",
                        "missing updated list structure",
                    )
                }
            }
            Check::QueueDequeue => {
                if baseline.is_empty() {
                    verdict(
                        EMPTY.is_match(payload.text()),
                        "empty queue reported",
                        "should indicate empty queue",
                    )
                } else {
                    verdict(
                        payload.has_key("dequeuedValue"),
                        "dequeued value reported",
                        "missing dequeued value",
                    )
                }
            }
            Check::QueueEnqueue => verdict(
                payload.has_key("updatedQueue"),
                "updated queue reported",
                "missing updated queue state",
            ),
            Check::QueueDisplay => verdict(
                payload.mentions_ci("queue"),
                "queue contents reported",
                "missing queue contents",
            ),
            Check::QueueExists => verdict(
                payload.mentions_ci("exists"),
                "existence result reported",
                "missing existence check result",
            ),
        }
    }
}

/// Looks for `edge` in the edge list under the graph update key. Edges may be
/// `{"from": a, "to": b}`, `{"source": a, "target": b}` or `[a, b]`.
fn lists_edge(payload: &Payload, edge: Edge) -> bool {
    let Some(update) = payload.find_key("graphUpdate") else {
        return false;
    };
    let Some(Value::Array(edges)) = update.get("edges") else {
        return false;
    };

    edges.iter().filter_map(edge_ends).any(|e| e == edge)
}

fn edge_ends(value: &Value) -> Option<Edge> {
    let (a, b) = match value {
        Value::Object(map) => {
            let a = map.get("from").or_else(|| map.get("source"))?;
            let b = map.get("to").or_else(|| map.get("target"))?;
            (a, b)
        }
        Value::Array(pair) if pair.len() >= 2 => (&pair[0], &pair[1]),
        _ => return None,
    };
    Some(Edge::new(a.as_i64()?, b.as_i64()?))
}

/// A boolean `found` key wins; otherwise fall back to the reply mentioning both
/// "found" and "true".
fn claims_found(payload: &Payload) -> bool {
    match payload.find_key("found") {
        Some(Value::Bool(found)) => *found,
        _ => payload.mentions_ci("found") && payload.mentions_ci("true"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::extract::extract;

    fn payload(raw: &str) -> Payload {
        extract(raw).expect("test payload must parse")
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RuleTable::standard();
        let rule = table.lookup(StructureKind::Queue, "Check if value exists").unwrap();
        assert_eq!(rule.check, Check::QueueExists);
        let rule = table.lookup(StructureKind::Graph, "Check path").unwrap();
        assert_eq!(rule.check, Check::GraphPath);
        let rule = table.lookup(StructureKind::Graph, "shortest path").unwrap();
        assert_eq!(rule.check, Check::GraphPath);
    }

    #[test]
    fn label_matching_is_case_sensitive_for_plain_words() {
        let table = RuleTable::standard();
        assert!(table.lookup(StructureKind::Tree, "search").is_none());
        assert!(table.lookup(StructureKind::Queue, "Get front").is_none());
        assert!(table.lookup(StructureKind::LinkedList, "Search value").is_none());
    }

    #[test]
    fn rules_do_not_leak_across_kinds() {
        let table = RuleTable::empty().with(Rule::new(
            StructureKind::Tree,
            &[OpPattern::Word("Insert")],
            Check::TreeInsert,
        ));
        assert_eq!(table.len(), 1);
        assert!(table.lookup(StructureKind::Graph, "Insert").is_none());
    }

    #[test]
    fn edges_match_in_either_direction_and_shape() {
        let p = payload(r#"{"graphUpdate": {"edges": [{"from": 8, "to": 3}]}}"#);
        assert!(lists_edge(&p, Edge::new(3, 8)));
        let p = payload(r#"{"graphUpdate": {"edges": [[3, 8]]}}"#);
        assert!(lists_edge(&p, Edge::new(8, 3)));
        let p = payload(r#"{"edges": [[3, 8]]}"#);
        assert!(!lists_edge(&p, Edge::new(3, 8)));
    }

    #[test]
    fn indicators_tolerate_spelling() {
        assert!(OUT_OF_BOUNDS.is_match("Index Out-Of-Range"));
        assert!(NOT_EXIST.is_match("node doesn't exist"));
        assert!(NOT_FOUND.is_match("{\"status\":\"notFound\"}"));
        assert!(!NOT_FOUND.is_match("found it"));
    }

    #[test]
    fn found_key_beats_text() {
        assert!(!claims_found(&payload(r#"{"found": false, "note": "true story"}"#)));
        assert!(claims_found(&payload(r#"{"result": "Found", "ok": true}"#)));
    }
}
