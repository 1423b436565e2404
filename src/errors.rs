//! Error types for the traffic analysis engine
//!
//! Every recoverable failure carries the endpoint or probe it belongs to so that
//! diagnostics can always be attributed. None of these abort a campaign on their
//! own; the orchestrator decides what to record and what to skip.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while executing a command on an endpoint
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The command could not be started at all
    #[error("failed to spawn command on '{endpoint}': {source}")]
    Spawn {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully; captured text is kept
    #[error("command on '{endpoint}' exited with status {status:?}")]
    NonZeroExit {
        endpoint: String,
        status: Option<i32>,
        output: String,
    },

    /// The command exceeded the configured timeout and was killed; text read
    /// up to that point is kept
    #[error("command on '{endpoint}' timed out after {timeout_secs}s")]
    Timeout {
        endpoint: String,
        timeout_secs: u64,
        output: String,
    },
}

impl RunnerError {
    /// Text captured before the failure, if any
    pub fn partial_output(&self) -> &str {
        match self {
            RunnerError::NonZeroExit { output, .. } | RunnerError::Timeout { output, .. } => {
                output
            }
            RunnerError::Spawn { .. } => "",
        }
    }
}

/// Failures while reading an endpoint's interface counters
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("interface '{interface}' not found in counter source of '{endpoint}'")]
    InterfaceMissing { endpoint: String, interface: String },

    #[error("malformed counter line for '{interface}' on '{endpoint}': {line}")]
    MalformedLine {
        endpoint: String,
        interface: String,
        line: String,
    },

    #[error("could not read counters on '{endpoint}': {source}")]
    Runner {
        endpoint: String,
        #[source]
        source: RunnerError,
    },
}

/// Failures raised by the bandwidth monitor for a single endpoint or a whole run
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),

    /// Final counter is below the initial one (reset or wrap)
    #[error(
        "counter regression on '{endpoint}': rx {initial_rx} -> {final_rx}, tx {initial_tx} -> {final_tx}"
    )]
    CounterRegression {
        endpoint: String,
        initial_rx: u64,
        final_rx: u64,
        initial_tx: u64,
        final_tx: u64,
    },

    #[error("monitoring duration must be greater than zero")]
    InvalidDuration,
}

impl MonitorError {
    /// Short machine-readable kind used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Sampling(_) => "counter_parse_failure",
            MonitorError::CounterRegression { .. } => "counter_regression_failure",
            MonitorError::InvalidDuration => "invalid_duration",
        }
    }
}

/// Failures writing or reading a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read report from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Extra metric groups may not shadow the typed `bandwidth` group
    #[error("metric group name '{0}' is reserved")]
    ReservedGroup(String),
}

/// Setup and orchestration failures
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("unknown endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("campaign cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}
