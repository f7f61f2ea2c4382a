//! Reconciliation consumer
//!
//! Applies bus messages to the analytical store idempotently: every write
//! is preceded by an existence check on the primary key, so redelivered
//! messages are acknowledged without side effect. Malformed payloads and
//! unknown message types are negative-acked with requeue — the operator
//! drains them; the core attempts no poison-message quarantine. Store
//! failures requeue so the broker retries.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::{BusMessage, MessageKind, OrderDto, ReceiptDto, TradePutDto};
use crate::store::{AnalyticsStore, StoreError};

/// What to tell the broker about one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Applied (or already applied): acknowledge.
    Ack,
    /// Could not be applied: negative-ack and requeue for retry.
    NackRequeue,
}

/// Counters accumulated over a consumer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub applied: u64,
    pub duplicates: u64,
    pub requeued: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum Applied {
    Fresh,
    Duplicate,
}

#[derive(Error, Debug)]
enum ApplyError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Idempotent applicator of bus messages to the analytical store.
pub struct ReconciliationConsumer<S: AnalyticsStore> {
    store: S,
    stats: ConsumerStats,
}

impl<S: AnalyticsStore> ReconciliationConsumer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            stats: ConsumerStats::default(),
        }
    }

    /// Parse and apply one raw delivery.
    pub fn apply_raw(&mut self, raw: &[u8]) -> Disposition {
        match BusMessage::from_bytes(raw) {
            Ok(message) => self.apply(&message),
            Err(err) => {
                warn!(error = %err, "malformed bus message, requeueing for operator draining");
                self.stats.requeued += 1;
                Disposition::NackRequeue
            }
        }
    }

    /// Apply one parsed message.
    pub fn apply(&mut self, message: &BusMessage) -> Disposition {
        let result = match message.kind {
            MessageKind::OrderPut => self.order_put(&message.data),
            MessageKind::OrderUpdate => self.order_update(&message.data),
            MessageKind::OrderDelete => self.order_delete(&message.data),
            MessageKind::TradePut => self.trade_put(&message.data),
            MessageKind::ReceiptPut => self.receipt_put(&message.data),
        };

        match result {
            Ok(Applied::Fresh) => {
                self.stats.applied += 1;
                Disposition::Ack
            }
            Ok(Applied::Duplicate) => {
                debug!(msg_id = %message.id, kind = ?message.kind, "duplicate delivery, no-op");
                self.stats.duplicates += 1;
                Disposition::Ack
            }
            Err(err) => {
                warn!(msg_id = %message.id, kind = ?message.kind, error = %err, "apply failed, requeueing");
                self.stats.requeued += 1;
                Disposition::NackRequeue
            }
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn order_put(&mut self, data: &Value) -> Result<Applied, ApplyError> {
        let order: OrderDto = serde_json::from_value(data.clone())?;
        if self.store.order_exists(&order.id)? {
            return Ok(Applied::Duplicate);
        }
        self.store.insert_order(order)?;
        Ok(Applied::Fresh)
    }

    fn order_update(&mut self, data: &Value) -> Result<Applied, ApplyError> {
        let order: OrderDto = serde_json::from_value(data.clone())?;
        self.store.update_order(order)?;
        Ok(Applied::Fresh)
    }

    fn order_delete(&mut self, data: &Value) -> Result<Applied, ApplyError> {
        let order: OrderDto = serde_json::from_value(data.clone())?;
        if !self.store.order_exists(&order.id)? {
            // Already deleted or never synced; nothing to undo.
            return Ok(Applied::Duplicate);
        }
        self.store.delete_order(&order.id)?;
        Ok(Applied::Fresh)
    }

    fn trade_put(&mut self, data: &Value) -> Result<Applied, ApplyError> {
        let trade: TradePutDto = serde_json::from_value(data.clone())?;
        if self.store.trade_exists(&trade.id)? {
            return Ok(Applied::Duplicate);
        }
        self.store.insert_trade(trade)?;
        Ok(Applied::Fresh)
    }

    fn receipt_put(&mut self, data: &Value) -> Result<Applied, ApplyError> {
        let receipt: ReceiptDto = serde_json::from_value(data.clone())?;
        if self.store.receipt_exists(&receipt.order_id)? {
            return Ok(Applied::Duplicate);
        }
        self.store.insert_receipt(receipt)?;
        Ok(Applied::Fresh)
    }
}
