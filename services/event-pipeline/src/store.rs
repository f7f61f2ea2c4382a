//! Analytical store interface
//!
//! The SQL store itself is an external collaborator; the consumer only
//! needs existence checks and writes keyed by primary key. The in-memory
//! implementation backs tests and local runs.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::messages::{OrderDto, ReceiptDto, TradePutDto};

/// Persistence failures. The consumer turns these into requeues so the
/// broker retries the delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("row not found: {0}")]
    NotFound(String),
}

/// Write side of the analytical store, keyed by primary keys:
/// order id, trade id, and receipt order id.
pub trait AnalyticsStore {
    fn order_exists(&self, id: &str) -> Result<bool, StoreError>;
    fn insert_order(&mut self, order: OrderDto) -> Result<(), StoreError>;
    fn update_order(&mut self, order: OrderDto) -> Result<(), StoreError>;
    fn delete_order(&mut self, id: &str) -> Result<(), StoreError>;

    fn trade_exists(&self, id: &Uuid) -> Result<bool, StoreError>;
    fn insert_trade(&mut self, trade: TradePutDto) -> Result<(), StoreError>;

    fn receipt_exists(&self, order_id: &str) -> Result<bool, StoreError>;
    fn insert_receipt(&mut self, receipt: ReceiptDto) -> Result<(), StoreError>;
}

/// Hash-map backed store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: HashMap<String, OrderDto>,
    trades: HashMap<Uuid, TradePutDto>,
    receipts: HashMap<String, ReceiptDto>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, to exercise the requeue path.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    pub fn order(&self, id: &str) -> Option<&OrderDto> {
        self.orders.get(id)
    }

    pub fn receipt(&self, order_id: &str) -> Option<&ReceiptDto> {
        self.receipts.get(order_id)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl AnalyticsStore for MemoryStore {
    fn order_exists(&self, id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.orders.contains_key(id))
    }

    fn insert_order(&mut self, order: OrderDto) -> Result<(), StoreError> {
        self.check_available()?;
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    fn update_order(&mut self, order: OrderDto) -> Result<(), StoreError> {
        self.check_available()?;
        if !self.orders.contains_key(&order.id) {
            return Err(StoreError::NotFound(order.id));
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    fn delete_order(&mut self, id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn trade_exists(&self, id: &Uuid) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.trades.contains_key(id))
    }

    fn insert_trade(&mut self, trade: TradePutDto) -> Result<(), StoreError> {
        self.check_available()?;
        self.trades.insert(trade.id, trade);
        Ok(())
    }

    fn receipt_exists(&self, order_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.receipts.contains_key(order_id))
    }

    fn insert_receipt(&mut self, receipt: ReceiptDto) -> Result<(), StoreError> {
        self.check_available()?;
        self.receipts.insert(receipt.order_id.clone(), receipt);
        Ok(())
    }
}
