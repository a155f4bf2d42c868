// src/protocol/exchange.rs

use crate::context::{ProtocolConfig, RunConfig};
use crate::driver::{ChatDriver, DriverError, Surface};
use crate::error::Result;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Recorded in place of a reply when every attempt failed.
pub const NO_RESPONSE: &str = "No response found after retries";

/// What one exchange produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    NoResponse,
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::NoResponse => NO_RESPONSE,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Reply::Text(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    AwaitingResponse,
    Recovering,
    Done,
    Failed,
}

#[derive(Debug)]
enum AttemptError {
    Timeout { polls: u32 },
    Driver(DriverError),
}

impl From<DriverError> for AttemptError {
    fn from(e: DriverError) -> Self {
        AttemptError::Driver(e)
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Timeout { polls } => write!(f, "no reply after {polls} polls"),
            AttemptError::Driver(e) => write!(f, "{e}"),
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

/// Sends one message at a time and waits for the rendered reply, retrying with
/// a page reload part way through the attempt budget.
#[derive(Debug)]
pub struct InteractionProtocol {
    config: ProtocolConfig,
    input_locator: String,
    recovery_directive: String,
    state: ExchangeState,
    history: Vec<ExchangeState>,
}

impl InteractionProtocol {
    pub fn new(config: ProtocolConfig, input_locator: &str, recovery_directive: &str) -> Self {
        Self {
            config,
            input_locator: input_locator.to_string(),
            recovery_directive: recovery_directive.to_string(),
            state: ExchangeState::Idle,
            history: vec![ExchangeState::Idle],
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.protocol.clone(),
            &config.input_selector,
            &config.recovery_directive,
        )
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// States visited during the most recent [`send`](Self::send).
    pub fn history(&self) -> &[ExchangeState] {
        &self.history
    }

    fn enter(&mut self, state: ExchangeState) {
        tracing::debug!(from = ?self.state, to = ?state, "exchange transition");
        self.state = state;
        self.history.push(state);
    }

    /// Never fails: when the attempt budget runs out the result is
    /// [`Reply::NoResponse`].
    pub fn send<D: ChatDriver + ?Sized>(&mut self, driver: &mut D, message: &str) -> Reply {
        self.state = ExchangeState::Idle;
        self.history = vec![ExchangeState::Idle];

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                self.enter(ExchangeState::Idle);
            }

            if attempt == self.config.recovery_attempt {
                tracing::warn!(attempt = attempt + 1, "reloading page after repeated failures");
                self.enter(ExchangeState::Recovering);
                if let Err(e) = self.recover(driver) {
                    tracing::warn!(error = %e, "session stalled: recovery failed");
                    pause(self.config.error_backoff());
                    continue;
                }
            }

            match self.attempt(driver, message) {
                Ok(text) => {
                    tracing::debug!(attempt = attempt + 1, chars = text.len(), "reply received");
                    self.enter(ExchangeState::Done);
                    return Reply::Text(text);
                }
                Err(AttemptError::Timeout { polls }) => {
                    tracing::warn!(attempt = attempt + 1, polls, "no reply rendered");
                }
                Err(e @ AttemptError::Driver(_)) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "attempt failed");
                    pause(self.config.error_backoff());
                }
            }
        }

        self.enter(ExchangeState::Failed);
        tracing::warn!(attempts = self.config.max_attempts, "giving up on message");
        Reply::NoResponse
    }

    fn type_and_submit<D: ChatDriver + ?Sized>(
        &self,
        driver: &mut D,
        surface: &Surface,
        text: &str,
    ) -> std::result::Result<(), DriverError> {
        driver.set_value(surface, text)?;
        pause(self.config.typing_pause());
        driver.submit(surface)
    }

    fn attempt<D: ChatDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        message: &str,
    ) -> std::result::Result<String, AttemptError> {
        self.enter(ExchangeState::Sending);
        let surface = driver.locate_input()?;
        let seen = driver.rendered_responses()?.len();
        self.type_and_submit(driver, &surface, message)?;

        self.enter(ExchangeState::AwaitingResponse);
        pause(self.config.settle_after_submit());

        for _ in 0..self.config.poll_rounds {
            let rendered = driver.rendered_responses()?;
            if rendered.len() > seen {
                if let Some(text) = rendered.last().filter(|t| !t.is_empty() && *t != NO_RESPONSE) {
                    return Ok(text.clone());
                }
            }
            pause(self.config.poll_interval());
        }

        Err(AttemptError::Timeout {
            polls: self.config.poll_rounds,
        })
    }

    /// Reloads the page and repeats the format directive.
    fn recover<D: ChatDriver + ?Sized>(&mut self, driver: &mut D) -> std::result::Result<(), DriverError> {
        driver.refresh_page()?;
        pause(self.config.settle_after_recovery());

        let surface = driver.wait_until_present(&self.input_locator, self.config.input_timeout())?;
        self.type_and_submit(driver, &surface, &self.recovery_directive)?;
        pause(self.config.settle_after_recovery());
        Ok(())
    }
}

/// The chat page as a resource: opened once, used for one question at a time,
/// then closed.
pub struct Session<D: ChatDriver> {
    driver: D,
    protocol: InteractionProtocol,
    question_pause: Duration,
}

impl<D: ChatDriver> Session<D> {
    /// Navigates to the chat page and sends the format directive. The browser
    /// is released if the page cannot be opened.
    pub fn open(mut driver: D, config: &RunConfig) -> Result<Self> {
        if let Err(e) = driver.open(&config.chat_url) {
            if let Err(quit) = driver.quit() {
                tracing::warn!(error = %quit, "failed to close browser after navigation error");
            }
            return Err(e.into());
        }
        let mut protocol = InteractionProtocol::from_config(config);

        tracing::info!("sending format directive");
        if !protocol.send(&mut driver, &config.format_directive).is_answer() {
            tracing::warn!("format directive was not acknowledged");
        }
        pause(config.protocol.question_pause());

        Ok(Self {
            driver,
            protocol,
            question_pause: config.protocol.question_pause(),
        })
    }

    /// Sends `text` and waits for the reply, then waits the inter-question pause.
    pub fn ask(&mut self, text: &str) -> Reply {
        let reply = self.protocol.send(&mut self.driver, text);
        pause(self.question_pause);
        reply
    }

    pub fn protocol(&self) -> &InteractionProtocol {
        &self.protocol
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Releases the browser and hands the driver back.
    pub fn close(mut self) -> std::result::Result<D, DriverError> {
        self.driver.quit()?;
        Ok(self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ScriptedDriver, Step};
    use crate::error::ProbeError;

    fn protocol() -> InteractionProtocol {
        InteractionProtocol::new(ProtocolConfig::immediate(), "#prompt-textarea", "respond in JSON")
    }

    #[test]
    fn first_attempt_reply() {
        let mut driver = ScriptedDriver::new([Step::reply(r#"{"ok": true}"#)]);
        let mut p = protocol();
        assert_eq!(p.send(&mut driver, "hi"), Reply::Text(r#"{"ok": true}"#.into()));
        assert_eq!(
            p.history(),
            &[
                ExchangeState::Idle,
                ExchangeState::Sending,
                ExchangeState::AwaitingResponse,
                ExchangeState::Done
            ]
        );
        assert_eq!(driver.refreshes, 0);
    }

    #[test]
    fn third_attempt_recovers_then_succeeds() {
        let mut driver = ScriptedDriver::new([
            Step::Silent,
            Step::Silent,
            // the recovery directive
            Step::Silent,
            Step::reply("third time lucky"),
        ]);
        let mut p = protocol();

        let reply = p.send(&mut driver, "Q");
        assert_eq!(reply, Reply::Text("third time lucky".into()));
        assert_eq!(driver.refreshes, 1);
        assert_eq!(driver.sent, vec!["Q", "Q", "respond in JSON", "Q"]);
        assert!(p.history().contains(&ExchangeState::Recovering));
        assert_eq!(p.state(), ExchangeState::Done);
    }

    #[test]
    fn failed_recovery_still_resubmits_the_question() {
        let mut driver = ScriptedDriver::new([
            Step::Silent,
            Step::Silent,
            Step::Fail("directive rejected".into()),
            Step::reply("fourth"),
        ]);
        let mut p = protocol();

        let reply = p.send(&mut driver, "Q");
        assert_eq!(reply, Reply::Text("fourth".into()));
        assert_eq!(driver.refreshes, 1);
        assert_eq!(driver.sent, vec!["Q", "Q", "respond in JSON", "Q"]);

        // the recovering attempt is skipped; the next one starts from idle
        let history = p.history();
        let recovering = history
            .iter()
            .position(|s| *s == ExchangeState::Recovering)
            .expect("recovery attempted");
        assert_eq!(
            &history[recovering..],
            &[
                ExchangeState::Recovering,
                ExchangeState::Idle,
                ExchangeState::Sending,
                ExchangeState::AwaitingResponse,
                ExchangeState::Done
            ]
        );
    }

    #[test]
    fn failed_recovery_and_silent_last_attempt_yield_sentinel() {
        let mut driver = ScriptedDriver::new([
            Step::Silent,
            Step::Silent,
            Step::Fail("directive rejected".into()),
            Step::Silent,
        ]);
        let mut p = protocol();

        assert_eq!(p.send(&mut driver, "Q"), Reply::NoResponse);
        assert_eq!(p.state(), ExchangeState::Failed);
        assert_eq!(driver.sent, vec!["Q", "Q", "respond in JSON", "Q"]);
    }

    #[test]
    fn exhausted_budget_yields_sentinel() {
        let mut driver = ScriptedDriver::new([]);
        let mut p = protocol();
        let reply = p.send(&mut driver, "Q");
        assert_eq!(reply, Reply::NoResponse);
        assert_eq!(reply.text(), NO_RESPONSE);
        assert_eq!(p.state(), ExchangeState::Failed);
        // four question submissions plus one recovery directive
        assert_eq!(driver.sent.len(), 5);
    }

    #[test]
    fn driver_errors_count_as_failed_attempts() {
        let mut driver = ScriptedDriver::new([Step::Fail("stale element".into()), Step::reply("ok")]);
        let mut p = protocol();
        assert_eq!(p.send(&mut driver, "Q"), Reply::Text("ok".into()));
        assert_eq!(driver.refreshes, 0);
    }

    #[test]
    fn slow_reply_is_picked_up_by_polling() {
        let mut driver = ScriptedDriver::new([Step::Delayed {
            polls: 3,
            text: "late".into(),
        }]);
        let mut p = protocol();
        assert_eq!(p.send(&mut driver, "Q"), Reply::Text("late".into()));
    }

    #[test]
    fn reply_slower_than_poll_budget_times_out() {
        let mut driver = ScriptedDriver::new([
            Step::Delayed {
                polls: 10,
                text: "too late".into(),
            },
            Step::reply("second"),
        ]);
        let mut p = protocol();
        assert_eq!(p.send(&mut driver, "Q"), Reply::Text("second".into()));
    }

    #[test]
    fn earlier_replies_are_not_mistaken_for_new_ones() {
        let mut driver = ScriptedDriver::new([Step::reply("old answer")]);
        let mut p = protocol();
        p.send(&mut driver, "first");

        // nothing new is rendered for the second question
        let reply = p.send(&mut driver, "second");
        assert_eq!(reply, Reply::NoResponse);
    }

    #[test]
    fn session_sends_directive_and_closes() {
        let config = RunConfig::new().with_protocol(ProtocolConfig::immediate());
        let driver = ScriptedDriver::new([Step::reply("{}"), Step::reply(r#"{"updatedQueue": []}"#)]);

        let mut session = Session::open(driver, &config).unwrap();
        assert_eq!(session.driver().visited, vec![config.chat_url.clone()]);
        assert_eq!(session.driver().sent, vec![config.format_directive.clone()]);

        let reply = session.ask("Enqueue 4");
        assert!(reply.is_answer());

        let driver = session.close().unwrap();
        assert!(driver.closed);
    }

    #[test]
    fn unreachable_chat_page_releases_the_browser() {
        let config = RunConfig::new().with_protocol(ProtocolConfig::immediate());
        let mut driver = ScriptedDriver::new([]).unreachable("net::ERR_NAME_NOT_RESOLVED");

        // hand a borrow to the session so the driver can be inspected afterwards
        let err = Session::open(&mut driver, &config).err().expect("open fails");
        assert!(matches!(err, ProbeError::Driver(_)), "{err}");
        assert!(driver.closed);
        assert!(driver.sent.is_empty());
    }
}
