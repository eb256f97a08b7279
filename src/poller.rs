//! Status polling for in-flight export tasks
//!
//! A [`StatusPoller`] owns everything the polling loop needs: the task
//! identifier, its cancellation token, and the poll policy. The loop has two
//! terminal outcomes — the task becomes ready and the download URL is
//! returned, or a failure (transport error, policy limit, cancellation) ends
//! polling. There is no retry of a failed check; one bad query is terminal.
//!
//! Checks are sequential: the next delay starts only after the previous
//! response (or error) has arrived, so in-flight status requests never
//! overlap.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::ExportClient;
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::types::{ExportEvent, ResourceId, TaskId, TaskStatus};

/// Polls a single export task until it is ready, fails, or is cancelled
///
/// At most one poller exists per initiated task; the poller owns its timing
/// state, so no timer handle outlives it.
pub struct StatusPoller {
    client: ExportClient,
    resource: ResourceId,
    task_id: TaskId,
    config: PollConfig,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<ExportEvent>,
}

impl StatusPoller {
    /// Create a poller for a started task
    pub fn new(
        client: ExportClient,
        resource: ResourceId,
        task_id: TaskId,
        config: PollConfig,
        cancel: CancellationToken,
        event_tx: broadcast::Sender<ExportEvent>,
    ) -> Self {
        Self {
            client,
            resource,
            task_id,
            config,
            cancel,
            event_tx,
        }
    }

    /// Run the polling loop to a terminal state
    ///
    /// Issues one status query per tick, with the first query after one full
    /// interval. Resolves to the download URL once the server reports
    /// readiness. Every failure is both returned and mirrored onto the event
    /// channel; nothing is swallowed here.
    pub async fn run(self) -> Result<Url> {
        let started = Instant::now();
        let mut delay = self.config.interval;
        let mut checks: u32 = 0;

        loop {
            let sleep_for = self.bounded_sleep(delay, started);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(
                        resource = %self.resource,
                        task_id = %self.task_id,
                        "polling cancelled"
                    );
                    self.emit(ExportEvent::Cancelled {
                        resource: self.resource.clone(),
                        task_id: self.task_id.clone(),
                    });
                    return Err(Error::Cancelled);
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }

            if let Some(deadline) = self.config.deadline
                && started.elapsed() >= deadline
            {
                return Err(self.fail(Error::DeadlineExceeded { deadline }));
            }

            if let Some(max) = self.config.max_checks
                && checks >= max
            {
                return Err(self.fail(Error::CheckLimitReached { checks }));
            }

            checks += 1;
            match self.client.check(&self.resource, &self.task_id).await {
                Ok(TaskStatus::Ready) => {
                    self.emit(ExportEvent::StatusChecked {
                        resource: self.resource.clone(),
                        task_id: self.task_id.clone(),
                        attempt: checks,
                        status: "ready".to_string(),
                    });

                    let url = self.client.download_url(&self.resource, &self.task_id)?;
                    tracing::info!(
                        resource = %self.resource,
                        task_id = %self.task_id,
                        checks,
                        "export ready"
                    );
                    self.emit(ExportEvent::Ready {
                        resource: self.resource.clone(),
                        task_id: self.task_id.clone(),
                        download_url: url.to_string(),
                    });
                    return Ok(url);
                }
                Ok(TaskStatus::Processing(raw)) => {
                    tracing::debug!(
                        resource = %self.resource,
                        task_id = %self.task_id,
                        attempt = checks,
                        status = %raw,
                        "export still processing"
                    );
                    self.emit(ExportEvent::StatusChecked {
                        resource: self.resource.clone(),
                        task_id: self.task_id.clone(),
                        attempt: checks,
                        status: raw,
                    });
                    delay = self.next_delay(delay);
                }
                Err(e) => {
                    return Err(self.fail(e));
                }
            }
        }
    }

    /// Clamp the next sleep so the loop wakes at the deadline, not past it
    fn bounded_sleep(&self, delay: Duration, started: Instant) -> Duration {
        let mut sleep_for = if self.config.jitter {
            add_jitter(delay)
        } else {
            delay
        };
        if let Some(deadline) = self.config.deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            sleep_for = sleep_for.min(remaining);
        }
        sleep_for
    }

    /// Apply the backoff multiplier to the delay, capped at `max_interval`
    fn next_delay(&self, delay: Duration) -> Duration {
        if self.config.backoff_multiplier <= 1.0 {
            return delay;
        }
        Duration::from_secs_f64(delay.as_secs_f64() * self.config.backoff_multiplier)
            .min(self.config.max_interval)
    }

    /// Log a terminal failure and mirror it onto the event channel
    fn fail(&self, error: Error) -> Error {
        tracing::error!(
            resource = %self.resource,
            task_id = %self.task_id,
            error = %error,
            "polling failed"
        );
        self.emit(ExportEvent::Failed {
            resource: self.resource.clone(),
            task_id: Some(self.task_id.clone()),
            error: error.to_string(),
        });
        error
    }

    fn emit(&self, event: ExportEvent) {
        // Send fails only when no subscriber exists, which is fine
        self.event_tx.send(event).ok();
    }
}

/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CsrfToken;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poll_config(interval_ms: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(interval_ms),
            ..PollConfig::default()
        }
    }

    fn poller_for(server: &MockServer, config: PollConfig) -> StatusPoller {
        let client = ExportClient::new(&server.uri(), Some(CsrfToken::new("tok"))).unwrap();
        let (event_tx, _rx) = broadcast::channel(64);
        StatusPoller::new(
            client,
            ResourceId::new("42").unwrap(),
            TaskId::from("t-1"),
            config,
            CancellationToken::new(),
            event_tx,
        )
    }

    async fn mount_check_sequence(server: &MockServer, processing_count: u64) {
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .up_to_n_times(processing_count)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn two_processing_then_ready_makes_exactly_three_queries() {
        let server = MockServer::start().await;
        mount_check_sequence(&server, 2).await;

        let poller = poller_for(&server, poll_config(30));
        let url = poller.run().await.unwrap();
        assert_eq!(url.path(), "/download/42/pdf/download/t-1");

        // No further queries after the terminal state
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn first_query_waits_one_full_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
            .mount(&server)
            .await;

        let start = Instant::now();
        let poller = poller_for(&server, poll_config(100));
        poller.run().await.unwrap();

        assert!(
            start.elapsed() >= Duration::from_millis(90),
            "first check should come after one interval, took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn one_query_per_tick_until_terminal() {
        let server = MockServer::start().await;
        mount_check_sequence(&server, 3).await;

        let start = Instant::now();
        let poller = poller_for(&server, poll_config(60));
        poller.run().await.unwrap();
        let elapsed = start.elapsed();

        // 4 queries, one per 60ms tick
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
        assert!(
            elapsed >= Duration::from_millis(220),
            "4 ticks at 60ms should take at least ~240ms, took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn malformed_body_on_second_query_stops_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
            .mount(&server)
            .await;

        let poller = poller_for(&server, poll_config(30));
        let err = poller.run().await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));

        // The failure is terminal: no third query
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn network_error_is_terminal_and_never_navigates() {
        // Exclusive (non-pooled) server so dropping it closes the listener
        let server = MockServer::builder().start().await;
        let uri = server.uri();
        drop(server);

        let client = ExportClient::new(&uri, None).unwrap();
        let (event_tx, mut rx) = broadcast::channel(64);
        let poller = StatusPoller::new(
            client,
            ResourceId::new("42").unwrap(),
            TaskId::from("t-1"),
            poll_config(20),
            CancellationToken::new(),
            event_tx,
        );

        let err = poller.run().await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));

        // Failure is mirrored onto the event channel, no Ready event ever
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ExportEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn cancellation_between_ticks_issues_no_further_queries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .mount(&server)
            .await;

        let client = ExportClient::new(&server.uri(), None).unwrap();
        let (event_tx, _rx) = broadcast::channel(64);
        let cancel = CancellationToken::new();
        let poller = StatusPoller::new(
            client,
            ResourceId::new("42").unwrap(),
            TaskId::from("t-1"),
            poll_config(50),
            cancel.clone(),
            event_tx,
        );

        let handle = tokio::spawn(poller.run());

        // Let at least one check happen, then cancel mid-interval
        tokio::time::sleep(Duration::from_millis(80)).await;
        let seen = server.received_requests().await.unwrap().len();
        assert!(seen >= 1);
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let after = server.received_requests().await.unwrap().len();
        assert!(
            after <= seen + 1,
            "no new queries after cancellation: saw {seen} then {after}"
        );
    }

    #[tokio::test]
    async fn deadline_fires_without_waiting_a_full_interval() {
        let server = MockServer::start().await;
        mount_check_sequence(&server, u64::MAX).await;

        let config = PollConfig {
            interval: Duration::from_secs(10),
            deadline: Some(Duration::from_millis(100)),
            ..PollConfig::default()
        };

        let start = Instant::now();
        let poller = poller_for(&server, config);
        let err = poller.run().await.unwrap_err();

        assert!(matches!(err, Error::DeadlineExceeded { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "deadline should clamp the sleep, took {:?}",
            start.elapsed()
        );
        // The deadline elapsed during the first sleep: no query was ever sent
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn max_checks_limit_is_a_typed_terminal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/42/pdf/check/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .mount(&server)
            .await;

        let config = PollConfig {
            interval: Duration::from_millis(20),
            max_checks: Some(2),
            ..PollConfig::default()
        };

        let poller = poller_for(&server, config);
        let err = poller.run().await.unwrap_err();
        match err {
            Error::CheckLimitReached { checks } => assert_eq!(checks, 2),
            other => panic!("expected CheckLimitReached, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn backoff_stretches_the_gap_between_checks() {
        let server = MockServer::start().await;
        mount_check_sequence(&server, 2).await;

        let config = PollConfig {
            interval: Duration::from_millis(40),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(500),
            ..PollConfig::default()
        };

        let start = Instant::now();
        let poller = poller_for(&server, config);
        poller.run().await.unwrap();

        // Delays: 40ms + 80ms + 160ms = 280ms minimum
        assert!(
            start.elapsed() >= Duration::from_millis(250),
            "backoff should stretch delays, took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn events_trace_the_whole_poll_lifecycle() {
        let server = MockServer::start().await;
        mount_check_sequence(&server, 1).await;

        let client = ExportClient::new(&server.uri(), None).unwrap();
        let (event_tx, mut rx) = broadcast::channel(64);
        let poller = StatusPoller::new(
            client,
            ResourceId::new("42").unwrap(),
            TaskId::from("t-1"),
            poll_config(20),
            CancellationToken::new(),
            event_tx,
        );
        poller.run().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 3, "two checks plus Ready: {events:?}");
        assert!(
            matches!(&events[0], ExportEvent::StatusChecked { attempt: 1, status, .. } if status == "processing")
        );
        assert!(
            matches!(&events[1], ExportEvent::StatusChecked { attempt: 2, status, .. } if status == "ready")
        );
        assert!(matches!(&events[2], ExportEvent::Ready { .. }));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for _ in 0..200 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= delay * 2);
        }
    }
}
