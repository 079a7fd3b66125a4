//! Background transmission of buffered telemetry.
//!
//! One worker task owns the send buffer. Clients feed it through a bounded
//! `async_channel` and never wait for network I/O. The buffer is POSTed to the
//! ingestion endpoint when a flush is requested, when it reaches the batch size,
//! or when the flush interval elapses. Failed batches are logged and dropped.

use std::time::Duration;

use async_channel::Receiver;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

use super::envelope::{Envelope, TrackResponse};

/// Work items accepted by the worker.
#[derive(Debug)]
pub(crate) enum Command {
    Track(Box<Envelope>),
    Flush,
    /// Send everything buffered, acknowledge, then stop
    Drain(oneshot::Sender<()>),
}

/// POSTs batches to the ingestion API.
pub(crate) struct Transmitter {
    http: reqwest::Client,
    track_url: String,
}

impl Transmitter {
    pub fn new(track_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, track_url })
    }

    async fn send(&self, batch: &[Envelope]) -> Result<TrackResponse, String> {
        let response = self
            .http
            .post(&self.track_url)
            .json(batch)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Ingestion endpoint returned {}: {}", status, body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}

pub(crate) struct Worker {
    rx: Receiver<Command>,
    transmitter: Transmitter,
    buffer: Vec<Envelope>,
    max_batch_size: usize,
    flush_interval: Duration,
}

impl Worker {
    pub fn new(
        rx: Receiver<Command>,
        transmitter: Transmitter,
        max_batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            rx,
            transmitter,
            buffer: Vec::with_capacity(max_batch_size),
            max_batch_size: max_batch_size.max(1),
            flush_interval,
        }
    }

    /// Process commands until drained or every sender is dropped.
    pub async fn run(mut self) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Ok(Command::Track(envelope)) => {
                        self.buffer.push(*envelope);
                        if self.buffer.len() >= self.max_batch_size {
                            self.send_buffered().await;
                        }
                    }
                    Ok(Command::Flush) => self.send_buffered().await,
                    Ok(Command::Drain(done)) => {
                        self.drain_queue();
                        self.send_buffered().await;
                        let _ = done.send(());
                        break;
                    }
                    Err(_) => {
                        self.send_buffered().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.send_buffered().await,
            }
        }

        tracing::debug!("Telemetry worker stopped");
    }

    /// Move items already queued behind a drain request into the buffer.
    fn drain_queue(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            if let Command::Track(envelope) = command {
                self.buffer.push(*envelope);
            }
        }
    }

    async fn send_buffered(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);

        for chunk in batch.chunks(self.max_batch_size) {
            match self.transmitter.send(chunk).await {
                Ok(response) => {
                    tracing::debug!(
                        received = response.items_received,
                        accepted = response.items_accepted,
                        "Telemetry batch sent"
                    );
                    for error in &response.errors {
                        tracing::warn!(
                            index = error.index,
                            status = error.status_code,
                            reason = %error.message,
                            "Telemetry item rejected"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, items = chunk.len(), "Telemetry batch dropped");
                }
            }
        }
    }
}
