//! Trigger control state for the export button
//!
//! The control is disabled the moment an export starts and unconditionally
//! re-enabled after a fixed delay, independent of how the task itself turns
//! out. That decoupling is legacy UX (always allow another attempt after the
//! window) and is kept verbatim behind [`TriggerConfig::reenable_after`]
//! rather than silently "fixed".

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::config::TriggerConfig;
use crate::types::{ExportEvent, ResourceId};

/// Enabled/disabled state of the export trigger
///
/// Cloneable; all clones share the same flag. Each disable schedules its own
/// unconditional re-enable, mirroring the decoupled legacy timing.
#[derive(Clone)]
pub struct TriggerControl {
    enabled: Arc<AtomicBool>,
    config: TriggerConfig,
    event_tx: broadcast::Sender<ExportEvent>,
}

impl TriggerControl {
    /// Create an enabled trigger control
    pub fn new(config: TriggerConfig, event_tx: broadcast::Sender<ExportEvent>) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            config,
            event_tx,
        }
    }

    /// Whether the trigger currently accepts another export attempt
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Disable the trigger now and schedule the timed re-enable
    ///
    /// The re-enable fires after `reenable_after` whether or not the export
    /// has reached a terminal state by then.
    pub fn disable_for(&self, resource: &ResourceId) {
        self.enabled.store(false, Ordering::SeqCst);
        self.event_tx
            .send(ExportEvent::TriggerDisabled {
                resource: resource.clone(),
            })
            .ok();
        tracing::debug!(resource = %resource, "trigger disabled");

        let enabled = self.enabled.clone();
        let event_tx = self.event_tx.clone();
        let resource = resource.clone();
        let delay = self.config.reenable_after;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            enabled.store(true, Ordering::SeqCst);
            event_tx
                .send(ExportEvent::TriggerReenabled { resource: resource.clone() })
                .ok();
            tracing::debug!(resource = %resource, "trigger re-enabled");
        });
    }
}
