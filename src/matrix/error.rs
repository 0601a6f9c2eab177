//! Translator error kinds.

use thiserror::Error;

/// Why an inbound Matrix push could not be turned into an outgoing request.
///
/// Variants are checked in declaration order; the first failing check wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Body exceeded the configured maximum length.
    #[error("Matrix request is larger than the max allowed length")]
    RequestTooLarge,

    /// Body is not JSON or lacks the Matrix notification shape.
    #[error("invalid request: Matrix JSON invalid")]
    MessageInvalid,

    /// The device pushkey is not under the configured push server base URL.
    #[error("invalid request: push key must be prefixed with base URL, got {pushkey}")]
    PushkeyBaseUrlMismatch { pushkey: String },
}

impl MatrixError {
    /// Pushkey to report in a rejection body, if this error is a per-device rejection.
    pub fn rejected_pushkey(&self) -> Option<&str> {
        match self {
            MatrixError::PushkeyBaseUrlMismatch { pushkey } => Some(pushkey),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MatrixError::RequestTooLarge => "request_too_large",
            MatrixError::MessageInvalid => "message_invalid",
            MatrixError::PushkeyBaseUrlMismatch { .. } => "pushkey_base_url_mismatch",
        }
    }
}
