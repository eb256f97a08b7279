//! Error types for blog-export
//!
//! One variant per failure class the export workflow can hit: transport,
//! malformed payloads, rejected start requests, poll policy limits, and
//! caller mistakes (empty resource id, missing CSRF token).

use std::time::Duration;
use thiserror::Error;

/// Result type alias for blog-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for blog-export
///
/// This is the primary error type used throughout the library. Each variant
/// includes enough context to diagnose where in the workflow things went wrong.
#[derive(Debug, Error)]
pub enum Error {
    /// Network error on a start or check request
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not valid JSON for the expected wire type
    #[error("malformed response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Base URL or endpoint path could not be constructed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource identifier was empty
    #[error("resource identifier must be non-empty")]
    InvalidResource,

    /// Start request requires a CSRF token but none is configured
    #[error("no CSRF token configured for start request")]
    MissingCsrfToken,

    /// Server did not accept the start request
    #[error("export task not accepted: server returned status {status:?}")]
    StartRejected {
        /// The non-"success" status string the server returned
        status: String,
    },

    /// An export is already active for this resource
    #[error("export already in progress for resource {resource:?}")]
    ExportInProgress {
        /// The resource that already has an active poller
        resource: String,
    },

    /// Overall polling deadline elapsed before the task became ready
    #[error("export task not ready within deadline of {deadline:?}")]
    DeadlineExceeded {
        /// The configured deadline that was exceeded
        deadline: Duration,
    },

    /// Maximum number of status checks performed without reaching readiness
    #[error("export task not ready after {checks} status checks")]
    CheckLimitReached {
        /// Number of status checks that were issued
        checks: u32,
    },

    /// Export was cancelled before reaching a terminal state
    #[error("export cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}
