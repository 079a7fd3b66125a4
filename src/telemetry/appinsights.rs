//! Application Insights implementation of `TelemetryClient`.

use std::collections::HashMap;
use std::time::Duration;

use async_channel::{Sender, TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::TelemetrySettings;

use super::channel::{Command, Transmitter, Worker};
use super::envelope::{Envelope, TAG_SDK_VERSION};
use super::{
    ConnectionString, EventTelemetry, RequestTelemetry, TelemetryClient, TelemetryError,
    TraceTelemetry,
};

/// Client that batches telemetry and sends it to an Application Insights
/// ingestion endpoint from a background task.
///
/// Cloning is cheap; all clones feed the same worker.
#[derive(Clone)]
pub struct AppInsightsClient {
    tx: Sender<Command>,
    instrumentation_key: String,
    tags: HashMap<String, String>,
    sampling_percentage: f64,
}

impl AppInsightsClient {
    /// Create the client and spawn its worker on the current tokio runtime.
    ///
    /// The returned handle completes once the worker has stopped, either after
    /// `drain` or when every clone of the client is dropped.
    pub fn start(
        connection: ConnectionString,
        settings: &TelemetrySettings,
    ) -> Result<(Self, JoinHandle<()>), TelemetryError> {
        let transmitter = Transmitter::new(connection.track_url(), settings.send_timeout)
            .map_err(|e| TelemetryError::Client(e.to_string()))?;
        let (tx, rx) = async_channel::bounded(settings.queue_capacity);
        let worker = Worker::new(rx, transmitter, settings.max_batch_size, settings.flush_interval);
        let handle = tokio::spawn(worker.run());

        let mut tags = HashMap::new();
        tags.insert(
            TAG_SDK_VERSION.to_string(),
            format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        );

        tracing::info!(
            endpoint = %connection.ingestion_endpoint,
            sampling_percentage = settings.sampling_percentage,
            auto_collect_requests = settings.auto_collect_requests,
            auto_collect_dependencies = settings.auto_collect_dependencies,
            live_metrics = settings.live_metrics,
            "Application Insights client started"
        );

        Ok((
            Self {
                tx,
                instrumentation_key: connection.instrumentation_key,
                tags,
                sampling_percentage: settings.sampling_percentage,
            },
            handle,
        ))
    }

    /// Send everything buffered and stop the worker, waiting at most `timeout`.
    ///
    /// Returns `false` if the worker did not acknowledge in time.
    /// The bound covers both enqueueing the request behind a full queue and
    /// the worker's final send.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        let acknowledged = async {
            if self.tx.send(Command::Drain(done_tx)).await.is_err() {
                // Worker already stopped
                return true;
            }
            done_rx.await.is_ok()
        };
        tokio::time::timeout(timeout, acknowledged)
            .await
            .unwrap_or(false)
    }

    fn sampled_in(&self) -> bool {
        self.sampling_percentage >= 100.0 || fastrand::f64() * 100.0 < self.sampling_percentage
    }

    fn enqueue(&self, command: Command) -> Result<(), TelemetryError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => TelemetryError::QueueFull,
            TrySendError::Closed(_) => TelemetryError::Closed,
        })
    }

    fn track(&self, envelope: Envelope) -> Result<(), TelemetryError> {
        if !self.sampled_in() {
            return Ok(());
        }
        self.enqueue(Command::Track(Box::new(envelope)))
    }
}

impl TelemetryClient for AppInsightsClient {
    fn track_event(&self, event: EventTelemetry) -> Result<(), TelemetryError> {
        self.track(Envelope::event(&self.instrumentation_key, self.tags.clone(), event))
    }

    fn track_trace(&self, trace: TraceTelemetry) -> Result<(), TelemetryError> {
        self.track(Envelope::trace(&self.instrumentation_key, self.tags.clone(), trace))
    }

    fn track_request(&self, request: RequestTelemetry) -> Result<(), TelemetryError> {
        self.track(Envelope::request(&self.instrumentation_key, self.tags.clone(), request))
    }

    fn flush(&self) -> Result<(), TelemetryError> {
        self.enqueue(Command::Flush)
    }
}
