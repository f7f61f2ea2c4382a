//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::decimal::Decimal;
use types::ids::OrderId;

use super::price_level::PriceLevel;

/// Bid (buy) side order book.
///
/// The highest price is the best bid. At each price level, orders are
/// maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Place an order at the tail of its price level, creating the level if
    /// absent.
    pub fn insert(&mut self, price: Decimal, order_id: OrderId, remaining: Decimal) {
        self.levels
            .entry(price)
            .or_default()
            .append(order_id, remaining);
    }

    /// Remove an order from its level; drops the level if empty.
    pub fn remove(&mut self, order_id: &OrderId, price: Decimal) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Best bid price (highest).
    pub fn best_price(&self) -> Option<Decimal> {
        self.levels.keys().next_back().copied()
    }

    /// Mutable reference to the best bid level.
    pub(crate) fn best_level_mut(&mut self) -> Option<(Decimal, &mut PriceLevel)> {
        self.levels
            .iter_mut()
            .next_back()
            .map(|(price, level)| (*price, level))
    }

    /// Mutable reference to the level at an exact price.
    pub(crate) fn level_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Drop a level that became empty during matching.
    pub(crate) fn drop_level_if_empty(&mut self, price: Decimal) {
        if self.levels.get(&price).is_some_and(|l| l.is_empty()) {
            self.levels.remove(&price);
        }
    }

    /// Iterate levels best-first (highest price first).
    pub fn iter_best_first(&self) -> impl Iterator<Item = (Decimal, &PriceLevel)> {
        self.levels.iter().rev().map(|(price, level)| (*price, level))
    }

    /// Depth snapshot: top N price levels with aggregate quantity.
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Decimal, Decimal)> {
        self.iter_best_first()
            .take(depth)
            .map(|(price, level)| (price, level.aggregate_remaining()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
