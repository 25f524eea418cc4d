//! Shared error and logging types.

use thiserror::Error;
use tracing::info;

/// Error types for catalog operations.
#[derive(Debug, Error)]
pub enum StacksmithError {
    /// Configuration is missing or inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection profile is not usable for API calls
    #[error("connection profile not ready: {0}")]
    ProfileNotReady(String),

    /// No response from the catalog at all (timeout, DNS, refused)
    #[error("could not reach catalog: {0}")]
    Transport(String),

    /// A 401/403 was answered with a refresh attempt that also failed
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// Selected template carries no fields to build a sheet from
    #[error("template '{0}' has no fields")]
    EmptyTemplate(String),

    /// Sheet file could not be written or read
    #[error("sheet error: {0}")]
    Sheet(String),

    /// Upload input contained no rows
    #[error("no rows to upload")]
    NoRows,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StacksmithError>;

/// Destination for operator-facing messages.
///
/// The core never assumes a console: the shell injects whatever sink it
/// wants (terminal, log pane, test buffer).
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Default sink: forward operator messages to `tracing`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        info!("{}", message);
    }
}

/// Test-friendly sink that records every message.
#[derive(Default)]
pub struct MemorySink {
    messages: std::sync::Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("sink poisoned").clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        self.messages.lock().expect("sink poisoned").push(message.to_string());
    }
}
