//! Fill receipts
//!
//! A receipt is the per-user summary of a completed fill path: all trades
//! that filled one of the user's orders, bundled and emitted exactly once.

use serde::{Deserialize, Serialize};
use types::decimal::Decimal;
use types::ids::{OrderId, UserId};
use types::order::Order;
use types::trade::Trade;

/// Per-user summary of a completed or terminated fill path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub trades: Vec<Trade>,
    pub filled_qty: Decimal,
}

/// In-flight position of a resting limit buy, accumulated across the sells
/// that fill it so one consolidated receipt can be emitted at completion.
#[derive(Debug, Clone)]
pub struct BuyerPos {
    /// Snapshot of the order as it came to rest.
    pub order: Order,
    /// Trades that have filled this order so far.
    pub trades: Vec<Trade>,
    /// Quantity still unfilled; always `original − Σ(trades.quantity)`.
    pub left: Decimal,
}

impl BuyerPos {
    pub fn new(order: Order) -> Self {
        let left = order.quantity_original;
        Self {
            order,
            trades: Vec::new(),
            left,
        }
    }

    /// Record a fill against this position.
    pub fn apply(&mut self, trade: Trade) {
        self.left = self.left - trade.quantity;
        self.trades.push(trade);
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_zero()
    }

    /// Whether any fill has landed since the order rested.
    pub fn has_fills(&self) -> bool {
        self.left != self.order.quantity_original
    }

    /// Consume the position into its consolidated receipt.
    pub fn into_receipt(self) -> Receipt {
        Receipt {
            user_id: self.order.user_id.clone(),
            order_id: self.order.id.clone(),
            filled_qty: self.order.quantity_original,
            trades: self.trades,
        }
    }
}
