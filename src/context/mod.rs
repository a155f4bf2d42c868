// src/context/mod.rs

use crate::error::{ProbeError, Result};
use crate::model::{StructureKind, TrackingMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FORMAT_DIRECTIVE: &str = "For all responses in this conversation, respond in JSON format. Don't even try to create a graph using python code";
pub const RECOVERY_DIRECTIVE: &str = "For all responses in this conversation, respond in JSON format";

/// Retry and timing knobs for the interaction protocol. Durations are in
/// milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtocolConfig {
    pub max_attempts: u32,
    /// Zero-based attempt before which the page is reloaded and the format
    /// directive repeated.
    pub recovery_attempt: u32,
    pub poll_rounds: u32,
    pub poll_interval_ms: u64,
    pub settle_after_submit_ms: u64,
    pub settle_after_recovery_ms: u64,
    pub typing_pause_ms: u64,
    pub error_backoff_ms: u64,
    pub question_pause_ms: u64,
    pub input_timeout_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            recovery_attempt: 2,
            poll_rounds: 5,
            poll_interval_ms: 2_000,
            settle_after_submit_ms: 5_000,
            settle_after_recovery_ms: 5_000,
            typing_pause_ms: 1_000,
            error_backoff_ms: 2_000,
            question_pause_ms: 3_000,
            input_timeout_ms: 10_000,
        }
    }
}

impl ProtocolConfig {
    /// Same retry budget, no waiting anywhere.
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 0,
            settle_after_submit_ms: 0,
            settle_after_recovery_ms: 0,
            typing_pause_ms: 0,
            error_backoff_ms: 0,
            question_pause_ms: 0,
            input_timeout_ms: 0,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_after_submit(&self) -> Duration {
        Duration::from_millis(self.settle_after_submit_ms)
    }

    pub fn settle_after_recovery(&self) -> Duration {
        Duration::from_millis(self.settle_after_recovery_ms)
    }

    pub fn typing_pause(&self) -> Duration {
        Duration::from_millis(self.typing_pause_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn question_pause(&self) -> Duration {
        Duration::from_millis(self.question_pause_ms)
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }
}

/// Everything a run needs, loaded from an optional JSON file and then
/// overridden from the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    pub webdriver_url: String,
    pub chat_url: String,
    pub browser: String,
    pub browser_args: Vec<String>,
    pub input_selector: String,
    pub response_selector: String,
    pub format_directive: String,
    pub recovery_directive: String,
    pub kinds: Vec<StructureKind>,
    pub pool_size: usize,
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    pub tracking: TrackingMode,
    pub protocol: ProtocolConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            chat_url: "https://chat.openai.com".into(),
            browser: "chrome".into(),
            browser_args: vec!["--no-sandbox".into(), "--disable-dev-shm-usage".into()],
            input_selector: "#prompt-textarea".into(),
            response_selector: ".markdown".into(),
            format_directive: FORMAT_DIRECTIVE.into(),
            recovery_directive: RECOVERY_DIRECTIVE.into(),
            kinds: StructureKind::ALL.to_vec(),
            pool_size: 5,
            seed: None,
            output_dir: PathBuf::from("."),
            tracking: TrackingMode::Fixed,
            protocol: ProtocolConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn with_kinds(mut self, kinds: &[StructureKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn enable_live_model(mut self) -> Self {
        self.tracking = TrackingMode::Live;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.kinds.is_empty() {
            return Err(ProbeError::Config("no structure kinds enabled".into()));
        }
        if self.protocol.max_attempts == 0 {
            return Err(ProbeError::Config("maxAttempts must be at least 1".into()));
        }
        if self.pool_size == 0 {
            return Err(ProbeError::Config("poolSize must be at least 1".into()));
        }
        Ok(())
    }
}
