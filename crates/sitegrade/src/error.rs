//! Engine-level error type returned at the public boundary.

use std::time::Duration;

/// Errors surfaced to callers of [`crate::Engine`].
///
/// Page-level transport failures and unavailable metrics are not errors:
/// they are recorded inside the [`crate::AuditResult`]. An `EngineError`
/// means the caller did not receive a result at all.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The target URL could not be parsed or uses an unsupported scheme.
    #[error("invalid target url `{url}`: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the audit and the policy asked for an error.
    #[error("audit cancelled before completion")]
    Cancelled,

    /// The overall audit budget elapsed and the policy asked for an error.
    #[error("audit exceeded its overall deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The shared HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    /// A blocking evaluation task died before returning.
    #[error("evaluation task failed: {0}")]
    Evaluation(String),

    /// The runtime for a blocking audit could not be started.
    #[error("failed to start audit runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid_target(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the two "no result because the run was stopped" variants.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded(_))
    }
}
