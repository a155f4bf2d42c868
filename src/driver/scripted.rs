// src/driver/scripted.rs

use crate::driver::{ChatDriver, DriverError, Surface};
use std::collections::VecDeque;
use std::time::Duration;

/// What the fake page does after a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// A reply is rendered immediately.
    Reply(String),
    /// A reply shows up after `polls` more calls to `rendered_responses`.
    Delayed { polls: usize, text: String },
    /// Nothing is rendered.
    Silent,
    /// The submit call itself fails.
    Fail(String),
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Step::Reply(text.to_string())
    }
}

/// In-memory chat page. Each submission consumes the next [`Step`]; once the
/// script runs out every submission is silent.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    script: VecDeque<Step>,
    rendered: Vec<String>,
    pending: Option<(usize, String)>,
    draft: String,
    unreachable: Option<String>,
    /// Every submitted text, in order.
    pub sent: Vec<String>,
    pub visited: Vec<String>,
    pub refreshes: usize,
    pub closed: bool,
}

impl ScriptedDriver {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Navigation fails with `message`; the page never loads.
    pub fn unreachable(mut self, message: &str) -> Self {
        self.unreachable = Some(message.to_string());
        self
    }

    pub fn push(&mut self, step: Step) {
        self.script.push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed { Err(DriverError::Closed) } else { Ok(()) }
    }
}

impl ChatDriver for ScriptedDriver {
    fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        if let Some(message) = &self.unreachable {
            return Err(DriverError::Protocol {
                command: "navigate".into(),
                message: message.clone(),
            });
        }
        self.visited.push(url.to_string());
        Ok(())
    }

    fn locate_input(&mut self) -> Result<Surface, DriverError> {
        self.ensure_open()?;
        Ok(Surface("scripted-input".into()))
    }

    fn set_value(&mut self, _surface: &Surface, text: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.draft = text.to_string();
        Ok(())
    }

    fn submit(&mut self, _surface: &Surface) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.sent.push(std::mem::take(&mut self.draft));
        match self.script.pop_front().unwrap_or(Step::Silent) {
            Step::Reply(text) => self.rendered.push(text),
            Step::Delayed { polls, text } => self.pending = Some((polls, text)),
            Step::Silent => {}
            Step::Fail(message) => {
                return Err(DriverError::Protocol {
                    command: "submit".into(),
                    message,
                });
            }
        }
        Ok(())
    }

    fn rendered_responses(&mut self) -> Result<Vec<String>, DriverError> {
        self.ensure_open()?;
        if let Some((polls, text)) = self.pending.take() {
            if polls == 0 {
                self.rendered.push(text);
            } else {
                self.pending = Some((polls - 1, text));
            }
        }
        Ok(self.rendered.clone())
    }

    fn refresh_page(&mut self) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.refreshes += 1;
        self.pending = None;
        Ok(())
    }

    fn wait_until_present(&mut self, _locator: &str, _timeout: Duration) -> Result<Surface, DriverError> {
        self.locate_input()
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
