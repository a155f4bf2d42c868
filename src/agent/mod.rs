// src/agent/mod.rs

use crate::context::RunConfig;
use crate::driver::ChatDriver;
use crate::error::Result;
use crate::memory::{OutcomeLog, SessionOutcome};
use crate::model::ExpectedStateTracker;
use crate::protocol::{Question, QuestionPlan, Session};
use crate::validation::OperationValidator;

/// Drives a question plan through a chat session: ask, validate, record.
pub struct Runner {
    pub tracker: ExpectedStateTracker,
    pub validator: OperationValidator,
    pub log: OutcomeLog,
}

impl Runner {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            tracker: ExpectedStateTracker::new().with_mode(config.tracking),
            validator: OperationValidator::new(),
            log: OutcomeLog::new(),
        }
    }

    pub fn with_validator(mut self, validator: OperationValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Processes every question in order. Only an out-of-sync plan (a question
    /// for a kind that was never created) stops the run early.
    pub fn run<D: ChatDriver>(&mut self, session: &mut Session<D>, plan: &QuestionPlan) -> Result<()> {
        let total = plan.len();
        for (idx, question) in plan.iter().enumerate() {
            tracing::info!(number = idx + 1, total, kind = %question.kind, operation = %question.operation, "asking");
            let reply = session.ask(&question.text);
            self.process(idx + 1, question, reply.text())?;
        }
        Ok(())
    }

    /// Validates one reply and appends the outcome.
    pub fn process(&mut self, number: usize, question: &Question, response: &str) -> Result<()> {
        if question.is_create() {
            self.tracker.initialize(question.kind, &question.operands)?;
        }

        let outcome = self.validator.validate_reply(&self.tracker, question, response)?;
        if outcome.passed {
            self.tracker
                .commit(question.kind, &question.operation, &question.operands)?;
            tracing::info!(number, reason = %outcome.reason, "valid");
        } else {
            tracing::info!(number, reason = %outcome.reason, "invalid");
        }

        self.log.record(SessionOutcome {
            number,
            structure: question.kind,
            operation: question.operation.clone(),
            question: question.text.clone(),
            response: response.to_string(),
            valid: outcome.passed,
            reason: outcome.reason,
        });
        Ok(())
    }
}
