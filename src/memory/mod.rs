// src/memory/mod.rs

use crate::error::{ProbeError, Result};
use crate::model::StructureKind;
use serde::Serialize;

/// Characters of a reply shown in the failure listing.
pub const PREVIEW_CHARS: usize = 200;

/// One processed question. Appended in question order and never changed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub number: usize,
    pub structure: StructureKind,
    pub operation: String,
    pub question: String,
    pub response: String,
    pub valid: bool,
    pub reason: String,
}

impl SessionOutcome {
    /// The reply cut to [`PREVIEW_CHARS`] characters. The stored text is untouched.
    pub fn response_preview(&self) -> &str {
        match self.response.char_indices().nth(PREVIEW_CHARS) {
            Some((cut, _)) => &self.response[..cut],
            None => &self.response,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub incorrect: usize,
    /// Fraction in `0.0..=1.0`.
    pub success_rate: f64,
}

/// Ordered outcome log with running totals.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    entries: Vec<SessionOutcome>,
    incorrect: usize,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: SessionOutcome) {
        if !outcome.valid {
            self.incorrect += 1;
        }
        self.entries.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn incorrect(&self) -> usize {
        self.incorrect
    }

    pub fn entries(&self) -> &[SessionOutcome] {
        &self.entries
    }

    pub fn failures(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.entries.iter().filter(|o| !o.valid)
    }

    pub fn summarize(&self) -> Result<Summary> {
        let total = self.total();
        if total == 0 {
            return Err(ProbeError::DivisionUndefined);
        }
        Ok(Summary {
            total,
            incorrect: self.incorrect,
            success_rate: (total - self.incorrect) as f64 / total as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(number: usize, valid: bool, response: &str) -> SessionOutcome {
        SessionOutcome {
            number,
            structure: StructureKind::Queue,
            operation: "Enqueue".into(),
            question: format!("question {number}"),
            response: response.into(),
            valid,
            reason: if valid { "ok".into() } else { "missing updated queue state".into() },
        }
    }

    #[test]
    fn empty_log_has_no_rate() {
        assert!(matches!(OutcomeLog::new().summarize(), Err(ProbeError::DivisionUndefined)));
    }

    #[test]
    fn totals_and_rate() {
        let mut log = OutcomeLog::new();
        log.record(outcome(1, true, "{}"));
        log.record(outcome(2, false, "nope"));
        log.record(outcome(3, true, "{}"));
        log.record(outcome(4, false, "nope"));

        let summary = log.summarize().unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.incorrect, 2);
        assert!((summary.success_rate - 0.5).abs() < f64::EPSILON);
        let failed: Vec<usize> = log.failures().map(|o| o.number).collect();
        assert_eq!(failed, vec![2, 4]);
    }

    #[test]
    fn all_failed_still_summarizes() {
        let mut log = OutcomeLog::new();
        log.record(outcome(1, false, ""));
        let summary = log.summarize().unwrap();
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn preview_is_bounded_but_log_keeps_everything() {
        let long = "é".repeat(500);
        let mut log = OutcomeLog::new();
        log.record(outcome(1, false, &long));

        let entry = &log.entries()[0];
        assert_eq!(entry.response_preview().chars().count(), PREVIEW_CHARS);
        assert_eq!(entry.response.chars().count(), 500);
        assert_eq!(outcome(2, false, "short").response_preview(), "short");
    }
}
