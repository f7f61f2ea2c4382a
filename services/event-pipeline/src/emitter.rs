//! Event emitter
//!
//! Drains the engine's bounded event channel, serializes each lifecycle
//! transition into a bus message, and hands it to the transport. The
//! producer waits only for the broker's publish confirm, bounded by a
//! configurable timeout; on timeout or broker failure the event is dropped
//! and logged — the domain state stays authoritative and the book never
//! rolls back.
//!
//! The bounded channel is the only cross-thread boundary of the core: when
//! it fills, submission blocks, applying backpressure end-to-end.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use matching_engine::events::BookEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::messages::BusMessage;

/// Boxed publish future, so transports stay object-safe.
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

/// Broker-side publish failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("broker refused message: {0}")]
    Refused(String),
}

/// The transport a fanout bus exposes to the producer: publish one
/// persistent message and resolve once the broker confirms it.
pub trait Transport: Send + Sync {
    fn publish<'a>(&'a self, message: &'a BusMessage) -> PublishFuture<'a>;
}

/// Emitter tunables.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Capacity of the outbound event channel.
    pub channel_capacity: usize,
    /// How long to wait for the broker's publish confirm.
    pub confirm_timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            confirm_timeout: Duration::from_secs(5),
        }
    }
}

/// Counters accumulated over an emitter's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterReport {
    pub published: u64,
    pub dropped: u64,
}

/// Serializes lifecycle events and hands them to the transport.
pub struct EventEmitter<T: Transport> {
    rx: mpsc::Receiver<BookEvent>,
    transport: T,
    config: EmitterConfig,
}

impl<T: Transport> EventEmitter<T> {
    /// Create an emitter and the bounded sender the engine writes into.
    pub fn new(transport: T, config: EmitterConfig) -> (Self, mpsc::Sender<BookEvent>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        (
            Self {
                rx,
                transport,
                config,
            },
            tx,
        )
    }

    /// Drain events until every sender is gone, then report totals.
    pub async fn run(mut self) -> EmitterReport {
        let mut report = EmitterReport::default();

        while let Some(event) = self.rx.recv().await {
            let label = event.label();
            let message = match BusMessage::from_event(&event) {
                Ok(message) => message,
                Err(err) => {
                    error!(event = label, error = %err, "failed to serialize event, dropping");
                    report.dropped += 1;
                    continue;
                }
            };

            match timeout(self.config.confirm_timeout, self.transport.publish(&message)).await {
                Ok(Ok(())) => {
                    report.published += 1;
                    debug!(event = label, msg_id = %message.id, "event published");
                }
                Ok(Err(err)) => {
                    report.dropped += 1;
                    warn!(event = label, error = %err, "broker rejected event, dropping");
                }
                Err(_) => {
                    report.dropped += 1;
                    warn!(
                        event = label,
                        timeout_ms = self.config.confirm_timeout.as_millis() as u64,
                        "publish confirm timed out, dropping event"
                    );
                }
            }
        }

        debug!(
            published = report.published,
            dropped = report.dropped,
            "emitter drained"
        );
        report
    }
}
