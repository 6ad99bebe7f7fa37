//! Request-coalescing device poller
//!
//! A `DevicePoller` keeps at most one HTTP request in flight for its
//! device. Callers that arrive while a request is outstanding do not start
//! another one; they are parked on the waiter list and receive the
//! outcome of the outstanding request when it settles. Successful polls
//! push every reading to the host through a `CharacteristicSink`.

pub mod value_map;

use crate::client::{DeviceTransport, WriteParameter};
use crate::error::{BridgeError, ErrorReporter, Result};
use crate::platform::CharacteristicSink;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub use value_map::{coerce_number, parse_values, ValueMap};

/// Result of one device round trip, shared by every waiter
pub type PollOutcome = Result<ValueMap>;

#[derive(Default)]
struct PollState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<PollOutcome>>,
    last_outcome: Option<PollOutcome>,
    requests_started: u64,
}

/// Coalescing poller for a single device endpoint
pub struct DevicePoller {
    transport: Arc<dyn DeviceTransport>,
    characteristics: Vec<String>,
    sink: Option<Weak<dyn CharacteristicSink>>,
    state: Mutex<PollState>,
}

impl DevicePoller {
    /// Create a poller reading the given allow-list of characteristics
    pub fn new(transport: Arc<dyn DeviceTransport>, characteristics: Vec<String>) -> Self {
        Self {
            transport,
            characteristics,
            sink: None,
            state: Mutex::new(PollState::default()),
        }
    }

    /// Push readings of successful polls to `sink`
    pub fn with_sink(mut self, sink: &Arc<dyn CharacteristicSink>) -> Self {
        self.sink = Some(Arc::downgrade(sink));
        self
    }

    /// Characteristics read from each response
    pub fn characteristics(&self) -> &[String] {
        &self.characteristics
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Whether a request is currently outstanding
    pub fn is_in_flight(&self) -> bool {
        self.lock_state().in_flight
    }

    /// Outcome of the most recently settled request
    pub fn last_outcome(&self) -> Option<PollOutcome> {
        self.lock_state().last_outcome.clone()
    }

    /// Number of device requests issued so far
    pub fn requests_started(&self) -> u64 {
        self.lock_state().requests_started
    }

    /// Poll the device and wait for the result.
    ///
    /// Starts a request unless one is already outstanding, in which case
    /// the caller joins it. A write supplied while joining is not sent.
    pub async fn update_state(self: &Arc<Self>, write: Option<WriteParameter>) -> PollOutcome {
        let (tx, rx) = oneshot::channel();
        self.enqueue(write, Some(tx));

        rx.await
            .map_err(|_| BridgeError::internal("Poll task ended without settling"))?
    }

    /// Start a poll without waiting for it. Returns false if one was
    /// already outstanding.
    pub fn trigger(self: &Arc<Self>, write: Option<WriteParameter>) -> bool {
        self.enqueue(write, None)
    }

    /// Poll on a fixed period until the returned task is aborted.
    ///
    /// The first poll happens one period after the call. Ticks fire
    /// regardless of in-flight requests.
    pub fn spawn_update_timer(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let poller = Arc::clone(self);
        info!(endpoint = poller.endpoint(), ?period, "Starting periodic refresh");

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !poller.trigger(None) {
                    debug!(endpoint = poller.endpoint(), "Refresh skipped, request in flight");
                }
            }
        })
    }

    fn enqueue(
        self: &Arc<Self>,
        write: Option<WriteParameter>,
        waiter: Option<oneshot::Sender<PollOutcome>>,
    ) -> bool {
        let start = {
            let mut state = self.lock_state();
            state.waiters.extend(waiter);

            if state.in_flight {
                false
            } else {
                state.in_flight = true;
                state.requests_started += 1;
                true
            }
        };

        if start {
            tokio::spawn(Arc::clone(self).execute_poll(write));
        } else if let Some(write) = write {
            debug!(
                endpoint = self.endpoint(),
                %write,
                "Request already in flight, write not sent"
            );
        }

        start
    }

    async fn execute_poll(self: Arc<Self>, write: Option<WriteParameter>) {
        debug!(endpoint = self.endpoint(), write = ?write, "Polling device");

        let outcome = match self.transport.fetch(write.as_ref()).await {
            Ok(body) => parse_values(&body, &self.characteristics, self.endpoint()),
            Err(error) => Err(error),
        };

        if let Err(error) = &outcome {
            ErrorReporter::log_error(error, "poller", "update_state");
        }

        let waiters = {
            let mut state = self.lock_state();
            state.in_flight = false;
            state.last_outcome = Some(outcome.clone());
            std::mem::take(&mut state.waiters)
        };

        if let Ok(values) = &outcome {
            self.notify(values);
        }

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn notify(&self, values: &ValueMap) {
        let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        for (name, value) in values {
            sink.push_value(name, *value);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Transport that blocks until released and counts calls
    struct GatedTransport {
        calls: AtomicUsize,
        release: Notify,
        body: Mutex<Result<String>>,
        writes: Mutex<Vec<Option<WriteParameter>>>,
    }

    impl GatedTransport {
        fn new(body: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
                body: Mutex::new(body),
                writes: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_body(&self, body: Result<String>) {
            *self.body.lock().unwrap() = body;
        }
    }

    #[async_trait]
    impl DeviceTransport for GatedTransport {
        async fn fetch(&self, write: Option<&WriteParameter>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.writes.lock().unwrap().push(write.cloned());
            self.release.notified().await;
            self.body.lock().unwrap().clone()
        }

        fn endpoint(&self) -> &str {
            "http://test-device/"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        pushed: Mutex<Vec<(String, f64)>>,
    }

    impl CharacteristicSink for RecordingSink {
        fn push_value(&self, characteristic: &str, value: f64) {
            self.pushed
                .lock()
                .unwrap()
                .push((characteristic.to_string(), value));
        }
    }

    fn poller(transport: Arc<GatedTransport>, names: &[&str]) -> Arc<DevicePoller> {
        Arc::new(DevicePoller::new(
            transport,
            names.iter().map(|s| s.to_string()).collect(),
        ))
    }

    async fn wait_for_calls(transport: &GatedTransport, expected: usize) {
        while transport.call_count() < expected {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_waiters(poller: &DevicePoller, expected: usize) {
        while poller.lock_state().waiters.len() < expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_request() {
        let transport = GatedTransport::new(Ok(r#"{"LeakDetected": 1}"#.to_string()));
        let poller = poller(transport.clone(), &["LeakDetected"]);

        let first = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        wait_for_calls(&transport, 1).await;
        assert!(poller.is_in_flight());

        let second = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        assert!(!poller.trigger(None));
        wait_for_waiters(&poller, 2).await;

        transport.release.notify_one();
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first["LeakDetected"], 1.0);
        assert!(!poller.is_in_flight());
        assert_eq!(poller.requests_started(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_clears_in_flight() {
        let transport = GatedTransport::new(Err(BridgeError::transport("connection refused")));
        let poller = poller(transport.clone(), &["LeakDetected"]);

        let pending = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        wait_for_calls(&transport, 1).await;
        transport.release.notify_one();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(BridgeError::Transport(_))));
        assert!(!poller.is_in_flight());
        assert!(matches!(poller.last_outcome(), Some(Err(_))));

        transport.set_body(Ok(r#"{"LeakDetected": 0}"#.to_string()));
        let pending = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        wait_for_calls(&transport, 2).await;
        transport.release.notify_one();

        let values = pending.await.unwrap().unwrap();
        assert_eq!(values["LeakDetected"], 0.0);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_fails_poll() {
        let transport = GatedTransport::new(Ok("{}".to_string()));
        let poller = poller(transport.clone(), &["LeakDetected"]);

        let pending = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        wait_for_calls(&transport, 1).await;
        transport.release.notify_one();

        assert_eq!(
            pending.await.unwrap(),
            Err(BridgeError::empty_result("http://test-device/"))
        );
    }

    #[tokio::test]
    async fn test_write_only_sent_by_request_starter() {
        let transport = GatedTransport::new(Ok(r#"{"On": 1}"#.to_string()));
        let poller = poller(transport.clone(), &["On"]);

        let first = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(Some(WriteParameter::new("On", "1"))).await }
        });
        wait_for_calls(&transport, 1).await;

        assert!(!poller.trigger(Some(WriteParameter::new("On", "0"))));
        transport.release.notify_one();
        first.await.unwrap().unwrap();

        let writes = transport.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![Some(WriteParameter::new("On", "1"))]);
    }

    #[tokio::test]
    async fn test_successful_poll_notifies_sink() {
        let transport = GatedTransport::new(Ok(
            r#"{"CurrentTemperature": 22.5, "CurrentRelativeHumidity": 40, "Uptime": 9}"#
                .to_string(),
        ));
        let recording = Arc::new(RecordingSink::default());
        let sink: Arc<dyn CharacteristicSink> = recording.clone();
        let poller = Arc::new(
            DevicePoller::new(
                transport.clone(),
                vec![
                    "CurrentTemperature".to_string(),
                    "CurrentRelativeHumidity".to_string(),
                ],
            )
            .with_sink(&sink),
        );

        let pending = tokio::spawn({
            let poller = poller.clone();
            async move { poller.update_state(None).await }
        });
        wait_for_calls(&transport, 1).await;
        transport.release.notify_one();
        pending.await.unwrap().unwrap();

        let pushed = recording.pushed.lock().unwrap().clone();
        assert_eq!(
            pushed,
            vec![
                ("CurrentRelativeHumidity".to_string(), 40.0),
                ("CurrentTemperature".to_string(), 22.5),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_timer_polls_each_period() {
        let transport = GatedTransport::new(Ok(r#"{"LeakDetected": 0}"#.to_string()));
        let poller = poller(transport.clone(), &["LeakDetected"]);

        let timer = poller.spawn_update_timer(Duration::from_secs(120));

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert_eq!(transport.call_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_for_calls(&transport, 1).await;
        assert_eq!(transport.call_count(), 1);

        // Still in flight at the next tick: no second request
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.call_count(), 1);

        transport.release.notify_one();
        timer.abort();
    }
}
