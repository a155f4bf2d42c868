// src/error.rs

use crate::model::StructureKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that stop a run. Per-question failures never end up here; they are
/// recorded as failed outcomes instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Validation asked for a kind whose baseline was never seeded. The plan and
    /// the tracker are out of sync, so the run cannot continue.
    #[error("no baseline for {0}: create question was never processed")]
    NotInitialized(StructureKind),

    #[error("invalid seed values for {kind}: {reason}")]
    InvalidSeed { kind: StructureKind, reason: String },

    /// Success rate requested before anything was recorded.
    #[error("success rate undefined: no questions recorded")]
    DivisionUndefined,

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures raised by a [`ChatDriver`](crate::driver::ChatDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote end answered, but with something we cannot use.
    #[error("webdriver {command}: {message}")]
    Protocol { command: String, message: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {timeout_ms} ms waiting for {locator}")]
    WaitTimeout { locator: String, timeout_ms: u64 },

    #[error("session is closed")]
    Closed,
}
