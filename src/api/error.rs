//! Failure taxonomy for the backend adapter.
//!
//! Every adapter operation returns [`Result`]. The variants map onto how the
//! CLI reacts: `Auth` clears the stale session and asks the user to log in
//! again, `Validation` is reported before any request is sent, `Network`
//! gets a retry hint, and everything else is surfaced with the message the
//! server provided.

use thiserror::Error;

/// Result type alias for all adapter operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the backend adapter.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403 from the backend, a failed login, or a missing credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Client-side input rejection. Raised before any request is sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Transport-level failure: unreachable host, connection reset, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Any other non-2xx response. `message` is extracted from the response
    /// body when the server provides one.
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("failed to decode server response: {0}")]
    Decode(String),

    /// The configured backend flavor has no such endpoint and no
    /// degradation contract applies.
    #[error("{0} is not supported by the configured backend flavor")]
    Unsupported(&'static str),

    /// The credential store could not persist state the operation depends on.
    #[error("credential store error: {0}")]
    Store(String),
}

impl ApiError {
    /// Whether the error indicates a missing or rejected credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Whether a retry of the same action could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Http { status: 500..=599, .. })
    }
}
