//! Export workflow orchestration
//!
//! [`PdfExporter`] ties the pieces together: it disables the trigger,
//! issues the start request, spawns the status poller on a child
//! cancellation token, and broadcasts every lifecycle event to subscribers.
//! One export per resource at a time; a second attempt while a poller is
//! active is rejected rather than spawning a competing poller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::ExportClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::poller::StatusPoller;
use crate::trigger::TriggerControl;
use crate::types::{ExportEvent, ResourceId, TaskId};

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Main export workflow instance (cloneable - all fields are shared)
#[derive(Clone)]
pub struct PdfExporter {
    client: ExportClient,
    config: Arc<Config>,
    event_tx: broadcast::Sender<ExportEvent>,
    trigger: TriggerControl,
    /// Map of active exports to their cancellation tokens (enforces one
    /// poller per resource)
    active: Arc<Mutex<HashMap<ResourceId, CancellationToken>>>,
    shutdown: CancellationToken,
}

/// Handle to a single in-flight export
///
/// Lets the caller cancel the poller or wait for the terminal outcome.
/// Dropping the handle detaches the export; polling continues in the
/// background and subscribers still see its events.
#[derive(Debug)]
pub struct ExportHandle {
    task_id: TaskId,
    cancel: CancellationToken,
    join: JoinHandle<Result<Url>>,
}

impl ExportHandle {
    /// Identifier of the server-side task this handle tracks
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Cancel polling for this export
    ///
    /// The poller observes the token at its next suspension point and exits
    /// with [`Error::Cancelled`]; outstanding network requests are not
    /// interrupted mid-flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the export to reach a terminal state
    ///
    /// Resolves to the download URL once the task is ready, or the typed
    /// error that ended polling.
    pub async fn wait(self) -> Result<Url> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(Error::Other(format!("export task panicked: {e}"))),
        }
    }
}

impl PdfExporter {
    /// Create a new exporter from configuration
    ///
    /// Fails when `base_url` is not a valid URL. The CSRF token may be
    /// filled in later via a fresh `Config`; without one, `export` fails
    /// before issuing any request.
    pub fn new(config: Config) -> Result<Self> {
        let client = ExportClient::new(&config.base_url, config.csrf_token.clone())?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let trigger = TriggerControl::new(config.trigger.clone(), event_tx.clone());

        Ok(Self {
            client,
            config: Arc::new(config),
            event_tx,
            trigger,
            active: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to lifecycle events
    ///
    /// Multiple subscribers are supported; each receives every event emitted
    /// after subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ExportEvent> {
        self.event_tx.subscribe()
    }

    /// The trigger control shared by all exports
    pub fn trigger(&self) -> &TriggerControl {
        &self.trigger
    }

    /// Start exporting a resource and poll until its PDF is ready
    ///
    /// Disables the trigger immediately (with its decoupled timed re-enable),
    /// issues the start request, then spawns the poller. Returns a handle for
    /// cancelling or awaiting the outcome; events mirror everything the
    /// handle can report.
    pub async fn export(&self, resource: ResourceId) -> Result<ExportHandle> {
        let cancel = self.shutdown.child_token();
        {
            let mut active = self.active.lock().await;
            if active.contains_key(&resource) {
                return Err(Error::ExportInProgress {
                    resource: resource.as_str().to_string(),
                });
            }
            active.insert(resource.clone(), cancel.clone());
        }

        self.trigger.disable_for(&resource);

        let task_id = match self.client.start(&resource).await {
            Ok(task_id) => task_id,
            Err(e) => {
                self.active.lock().await.remove(&resource);
                self.event_tx
                    .send(ExportEvent::Failed {
                        resource: resource.clone(),
                        task_id: None,
                        error: e.to_string(),
                    })
                    .ok();
                return Err(e);
            }
        };

        self.event_tx
            .send(ExportEvent::TaskStarted {
                resource: resource.clone(),
                task_id: task_id.clone(),
            })
            .ok();

        let poller = StatusPoller::new(
            self.client.clone(),
            resource.clone(),
            task_id.clone(),
            self.config.poll.clone(),
            cancel.clone(),
            self.event_tx.clone(),
        );

        let active = self.active.clone();
        let join = tokio::spawn(async move {
            let result = poller.run().await;
            active.lock().await.remove(&resource);
            result
        });

        Ok(ExportHandle {
            task_id,
            cancel,
            join,
        })
    }

    /// Whether a resource currently has an active export
    pub async fn is_exporting(&self, resource: &ResourceId) -> bool {
        self.active.lock().await.contains_key(resource)
    }

    /// Cancel all in-flight exports
    ///
    /// Pollers exit at their next suspension point; no new exports are
    /// blocked, each simply gets a fresh child token of the already-cancelled
    /// root and ends immediately.
    pub fn shutdown(&self) {
        tracing::info!("cancelling all in-flight exports");
        self.shutdown.cancel();
    }
}
