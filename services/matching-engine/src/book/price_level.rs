//! Price level with FIFO queue
//!
//! A price level contains all resting orders at one price point, in strict
//! arrival order. Ties at the same price are broken by arrival sequence
//! only; there are no timestamps anywhere in the book.

use std::collections::VecDeque;
use types::decimal::Decimal;
use types::ids::OrderId;

/// A price level containing orders at a specific price.
///
/// The queue stores order ids with their book-side remaining quantity; the
/// order arena remains the authority on full order state. The cached
/// aggregate is the sum of live remaining quantities and is updated on
/// every mutation.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<LevelEntry>,
    aggregate_remaining: Decimal,
}

#[derive(Debug, Clone)]
struct LevelEntry {
    order_id: OrderId,
    remaining: Decimal,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            aggregate_remaining: Decimal::ZERO,
        }
    }

    /// Append an order at the back of the queue (time priority).
    pub fn append(&mut self, order_id: OrderId, remaining: Decimal) {
        self.orders.push_back(LevelEntry {
            order_id,
            remaining,
        });
        self.aggregate_remaining = self.aggregate_remaining + remaining;
    }

    /// Peek at the head of the queue without removing it.
    pub fn peek_head(&self) -> Option<(&OrderId, Decimal)> {
        self.orders
            .front()
            .map(|entry| (&entry.order_id, entry.remaining))
    }

    /// Pop the head of the queue.
    pub fn pop_head(&mut self) -> Option<(OrderId, Decimal)> {
        let entry = self.orders.pop_front()?;
        self.aggregate_remaining = self.aggregate_remaining - entry.remaining;
        Some((entry.order_id, entry.remaining))
    }

    /// Reduce the head order by a fill. A head filled to zero is removed;
    /// otherwise it keeps its position, preserving price-time priority.
    ///
    /// Returns false when the level is empty.
    pub fn fill_head(&mut self, delta: Decimal) -> bool {
        let Some(entry) = self.orders.front_mut() else {
            return false;
        };
        entry.remaining = entry.remaining - delta;
        self.aggregate_remaining = self.aggregate_remaining - delta;
        if entry.remaining.is_zero() {
            self.orders.pop_front();
        }
        true
    }

    /// Remove an order anywhere in the queue by id.
    ///
    /// O(k) at this level; level sizes are bounded in practice.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Decimal> {
        let position = self
            .orders
            .iter()
            .position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.aggregate_remaining = self.aggregate_remaining - entry.remaining;
        Some(entry.remaining)
    }

    /// Sum of live remaining quantities at this level.
    pub fn aggregate_remaining(&self) -> Decimal {
        self.aggregate_remaining
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
