//! Lifecycle events emitted by the engine
//!
//! One event per state transition, carrying the full snapshot at the
//! transition. The event pipeline serializes these onto the bus; a tagged
//! variant with exhaustive matching replaces any dynamic dispatch in
//! consumers.

use types::order::Order;
use types::trade::Trade;

use crate::receipt::Receipt;

/// A single lifecycle transition.
#[derive(Debug, Clone)]
pub enum BookEvent {
    /// An order was accepted (resting, parked, or consumed as a taker).
    OrderPut(Order),
    /// An order transitioned in place (e.g. stop activation).
    OrderUpdate(Order),
    /// An order left the book by cancellation.
    OrderDelete(Order),
    /// A trade was executed; one event per party entry.
    TradePut(Trade),
    /// A receipt was generated for a completed fill path.
    ReceiptPut(Receipt),
}

impl BookEvent {
    /// Event type label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            BookEvent::OrderPut(_) => "ORDER_PUT",
            BookEvent::OrderUpdate(_) => "ORDER_UPDATE",
            BookEvent::OrderDelete(_) => "ORDER_DELETE",
            BookEvent::TradePut(_) => "TRADE_PUT",
            BookEvent::ReceiptPut(_) => "RECEIPT_PUT",
        }
    }
}
