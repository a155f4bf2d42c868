// src/validation/mod.rs

pub mod extract;
pub mod rules;

use crate::error::Result;
use crate::model::{ExpectedStateTracker, StructureKind};
use crate::protocol::Question;
use serde::Serialize;

pub use extract::{Payload, extract};
pub use rules::{Check, OpPattern, Rule, RuleTable};

pub const INVALID_STRUCTURED_RESPONSE: &str = "invalid structured response";
pub const NO_SPECIFIC_RULE: &str = "no specific rule";

/// Verdict for one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
}

impl ValidationOutcome {
    pub fn pass(reason: &str) -> Self {
        Self {
            passed: true,
            reason: reason.to_string(),
        }
    }

    pub fn fail(reason: &str) -> Self {
        Self {
            passed: false,
            reason: reason.to_string(),
        }
    }
}

/// Checks replies against the expected state using a [`RuleTable`].
///
/// Holds no state of its own: the same arguments always give the same outcome.
#[derive(Clone, Debug, Default)]
pub struct OperationValidator {
    rules: RuleTable,
}

impl OperationValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// A missing payload fails straight away. Otherwise the first rule matching
    /// `kind` and `operation` decides; with no matching rule the reply passes.
    ///
    /// Errors only with `NotInitialized` when `kind` has no baseline.
    pub fn validate(
        &self,
        tracker: &ExpectedStateTracker,
        kind: StructureKind,
        operation: &str,
        operands: &[i64],
        payload: Option<&Payload>,
    ) -> Result<ValidationOutcome> {
        // An unparseable reply is a failed outcome even for a kind that was
        // never created; `NotInitialized` only surfaces once there is JSON to
        // compare against a baseline.
        let Some(payload) = payload else {
            return Ok(ValidationOutcome::fail(INVALID_STRUCTURED_RESPONSE));
        };
        let baseline = tracker.snapshot(kind)?;

        let outcome = self
            .rules
            .lookup(kind, operation)
            .and_then(|rule| rule.check.evaluate(baseline, operation, operands, payload))
            .unwrap_or_else(|| ValidationOutcome::pass(NO_SPECIFIC_RULE));
        Ok(outcome)
    }

    /// Extracts the payload from `raw` and validates it against `question`.
    pub fn validate_reply(
        &self,
        tracker: &ExpectedStateTracker,
        question: &Question,
        raw: &str,
    ) -> Result<ValidationOutcome> {
        let payload = extract(raw);
        self.validate(
            tracker,
            question.kind,
            &question.operation,
            &question.operands,
            payload.as_ref(),
        )
    }
}
