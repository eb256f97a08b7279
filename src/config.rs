//! Configuration types for blog-export

use crate::types::CsrfToken;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status polling behavior (interval, backoff, bounds)
///
/// The legacy workflow polled every 2 seconds with no bound; the defaults keep
/// the 2-second fixed cadence but add an overall deadline so an export that
/// never becomes ready cannot poll forever. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status checks (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Multiplier applied to the delay after each non-ready check (default: 1.0)
    ///
    /// 1.0 keeps the fixed cadence. Values above 1.0 back off between checks,
    /// capped by `max_interval`.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on the delay between checks when backing off (default: 30 seconds)
    #[serde(default = "default_max_interval", with = "duration_serde")]
    pub max_interval: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// Maximum number of status checks before giving up (None = no limit)
    #[serde(default)]
    pub max_checks: Option<u32>,

    /// Overall deadline for the task to become ready (default: 10 minutes)
    ///
    /// `None` restores the legacy unbounded behavior.
    #[serde(default = "default_deadline", with = "optional_duration_serde")]
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval: default_max_interval(),
            jitter: false,
            max_checks: None,
            deadline: default_deadline(),
        }
    }
}

/// Trigger control behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Delay after which the trigger is unconditionally re-enabled (default: 2 seconds)
    ///
    /// The re-enable is deliberately decoupled from task completion: the legacy
    /// UI always allowed another attempt after this window, whether or not the
    /// PDF was ready. Kept as an explicit option rather than a guessed fix.
    #[serde(default = "default_reenable_after", with = "duration_serde")]
    pub reenable_after: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            reenable_after: default_reenable_after(),
        }
    }
}

/// Markdown preview rendering mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Single-pass ordered regex substitution, matching the legacy tool's output
    #[default]
    Legacy,
    /// CommonMark parse-then-render via pulldown-cmark
    Commonmark,
}

/// Preview renderer behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Rendering mode (default: legacy single-pass substitution)
    #[serde(default)]
    pub mode: PreviewMode,

    /// Markup shown when the input is empty
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            mode: PreviewMode::default(),
            placeholder: default_placeholder(),
        }
    }
}

/// Hover menu behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Grace delay between the pointer leaving the trigger and the menu hiding
    /// (default: 300 milliseconds)
    #[serde(default = "default_hide_delay", with = "duration_millis_serde")]
    pub hide_delay: Duration,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            hide_delay: default_hide_delay(),
        }
    }
}

/// Main configuration for the export workflow
///
/// Fields are organized into logical sub-configs:
/// - [`poll`](PollConfig) — status polling cadence and bounds
/// - [`trigger`](TriggerConfig) — trigger disable/re-enable timing
/// - [`preview`](PreviewConfig) — Markdown preview rendering
/// - [`menu`](MenuConfig) — hover menu grace delay
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the blog server (e.g. `https://blog.example.com`)
    #[serde(default)]
    pub base_url: String,

    /// CSRF token for start requests; required before `export` is called
    #[serde(default)]
    pub csrf_token: Option<CsrfToken>,

    /// Status polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Trigger control settings
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Preview renderer settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Hover menu settings
    #[serde(default)]
    pub menu: MenuConfig,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_deadline() -> Option<Duration> {
    Some(Duration::from_secs(600))
}

fn default_reenable_after() -> Duration {
    Duration::from_secs(2)
}

fn default_placeholder() -> String {
    "<p>Nothing to preview</p>".to_string()
}

fn default_hide_delay() -> Duration {
    Duration::from_millis(300)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// The hide delay is sub-second, so it serializes as milliseconds.
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
