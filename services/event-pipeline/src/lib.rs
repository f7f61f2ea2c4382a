//! CQRS event pipeline
//!
//! Carries engine lifecycle events to downstream consumers: the emitter
//! serializes each transition onto a fanout bus behind a publisher-confirm
//! transport, and the reconciliation consumer applies deliveries to the
//! analytical store idempotently. Delivery is at-least-once; consumers must
//! treat duplicates as no-ops, and this crate's consumer does.

pub mod consumer;
pub mod emitter;
pub mod messages;
pub mod store;

pub use consumer::{ConsumerStats, Disposition, ReconciliationConsumer};
pub use emitter::{EmitterConfig, EmitterReport, EventEmitter, Transport, TransportError};
pub use messages::{BusMessage, MessageKind};
pub use store::{AnalyticsStore, MemoryStore, StoreError};
