//! Error types for the reporting pipeline

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::events::CheckKind;

/// A write failure that stopped the line sink's consumer thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFault {
    /// File the consumer was appending to when it failed
    pub path: PathBuf,
    /// Rendered IO error
    pub message: String,
}

impl std::fmt::Display for SinkFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Errors from the durable line sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Line sink is not installed")]
    NotInstalled,

    #[error("Line sink is already installed")]
    AlreadyInstalled,

    #[error("Line sink is closed")]
    Closed,

    #[error("Line sink stopped after a write failure: {0}")]
    Faulted(SinkFault),

    #[error("Line sink made no progress draining for {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Failed to spawn line sink thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors from session recording, formatting and report parsing
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No sequence session is running")]
    NoActiveSession,

    #[error("Check of kind '{kind}' is missing its {field} value")]
    MalformedCheck { kind: CheckKind, field: &'static str },

    #[error("Report parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results carrying a [`ReportError`]
pub type ReportResult<T = ()> = Result<T, ReportError>;
