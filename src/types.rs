//! Core types for blog-export

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of the blog resource being exported
///
/// Must be non-empty; the export workflow rejects empty identifiers before
/// issuing any network request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new ResourceId, rejecting empty input
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidResource);
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token identifying a server-side export task
///
/// The server may return the token as a JSON string or number; either form
/// deserializes into the same opaque string representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct TaskIdVisitor;

        impl serde::de::Visitor<'_> for TaskIdVisitor {
            type Value = TaskId;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or number task identifier")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<TaskId, E> {
                Ok(TaskId(v.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<TaskId, E> {
                Ok(TaskId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<TaskId, E> {
                Ok(TaskId(v.to_string()))
            }
        }

        deserializer.deserialize_any(TaskIdVisitor)
    }
}

// Attribute order in real templates varies, so both name-then-value and
// value-then-name are matched.
#[allow(clippy::expect_used)]
static CSRF_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*\bname="csrf_token"[^>]*\bvalue="([^"]*)""#)
        .expect("literal pattern compiles")
});

#[allow(clippy::expect_used)]
static CSRF_VALUE_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*\bvalue="([^"]*)"[^>]*\bname="csrf_token""#)
        .expect("literal pattern compiles")
});

/// CSRF token sent with the start request
///
/// Servers issue the token as a hidden `csrf_token` form field; use
/// [`CsrfToken::from_hidden_field`] to extract it from a rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Create a token from a known value
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Extract the token from a hidden `csrf_token` input field in an HTML page
    ///
    /// Returns [`Error::MissingCsrfToken`] when no such field is present;
    /// a page without the field is a caller error, not a recoverable state.
    pub fn from_hidden_field(html: &str) -> Result<Self> {
        CSRF_NAME_FIRST
            .captures(html)
            .or_else(|| CSRF_VALUE_FIRST.captures(html))
            .and_then(|caps| caps.get(1))
            .map(|value| Self(value.as_str().to_string()))
            .ok_or(Error::MissingCsrfToken)
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Status of a server-side export task as reported by a check query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// The PDF is generated and available for download
    Ready,
    /// Any other status string; the task is treated as still processing
    Processing(String),
}

impl TaskStatus {
    /// Interpret a raw wire status string
    ///
    /// Only `"ready"` is terminal; every other value keeps the poller going,
    /// matching the check endpoint's contract.
    pub fn from_wire(status: &str) -> Self {
        if status == "ready" {
            TaskStatus::Ready
        } else {
            TaskStatus::Processing(status.to_string())
        }
    }

    /// Whether the task has reached readiness
    pub fn is_ready(&self) -> bool {
        matches!(self, TaskStatus::Ready)
    }

    /// The raw status string as reported by the server
    pub fn as_wire(&self) -> &str {
        match self {
            TaskStatus::Ready => "ready",
            TaskStatus::Processing(raw) => raw,
        }
    }
}

/// Wire response of `POST /download/{resource}/pdf/start`
#[derive(Clone, Debug, Deserialize)]
pub struct StartResponse {
    /// `"success"` when the task was accepted
    pub status: String,
    /// Identifier of the accepted task; absent on rejection
    #[serde(default)]
    pub task_id: Option<TaskId>,
}

/// Wire response of `GET /download/{resource}/pdf/check/{task}`
#[derive(Clone, Debug, Deserialize)]
pub struct CheckResponse {
    /// `"ready"` once the PDF can be downloaded
    pub status: String,
}

/// Event emitted during the export lifecycle
///
/// All subscribers receive every event; failures are surfaced here as typed
/// events rather than being swallowed inside the workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportEvent {
    /// Server accepted the start request and returned a task id
    TaskStarted {
        /// Resource being exported
        resource: ResourceId,
        /// Identifier of the server-side task
        task_id: TaskId,
    },

    /// A status check completed without error
    StatusChecked {
        /// Resource being exported
        resource: ResourceId,
        /// Identifier of the server-side task
        task_id: TaskId,
        /// 1-based count of checks issued so far
        attempt: u32,
        /// Raw status string the server reported
        status: String,
    },

    /// Task reached readiness; the download URL is the navigation target
    Ready {
        /// Resource being exported
        resource: ResourceId,
        /// Identifier of the server-side task
        task_id: TaskId,
        /// URL serving the generated PDF
        download_url: String,
    },

    /// Export failed in a terminal way (transport error, policy limit, rejection)
    Failed {
        /// Resource being exported
        resource: ResourceId,
        /// Identifier of the server-side task, if the start request succeeded
        task_id: Option<TaskId>,
        /// Error message
        error: String,
    },

    /// Export was cancelled before reaching a terminal state
    Cancelled {
        /// Resource being exported
        resource: ResourceId,
        /// Identifier of the server-side task
        task_id: TaskId,
    },

    /// Trigger control disabled at export start
    TriggerDisabled {
        /// Resource whose trigger was disabled
        resource: ResourceId,
    },

    /// Trigger control re-enabled after its configured delay
    TriggerReenabled {
        /// Resource whose trigger was re-enabled
        resource: ResourceId,
    },
}
