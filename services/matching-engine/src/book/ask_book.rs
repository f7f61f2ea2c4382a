//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::decimal::Decimal;
use types::ids::OrderId;

use super::price_level::PriceLevel;

/// Ask (sell) side order book.
///
/// The lowest price is the best ask. At each price level, orders are
/// maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl AskBook {
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

    /// Best ask price (lowest).
    pub fn best_price(&self) -> Option<Decimal> {
        self.levels.keys().next().copied()
    }

    /// Mutable reference to the best ask level.
    pub(crate) fn best_level_mut(&mut self) -> Option<(Decimal, &mut PriceLevel)> {
        self.levels
            .iter_mut()
            .next()
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

    /// Iterate levels best-first (lowest price first).
    pub fn iter_best_first(&self) -> impl Iterator<Item = (Decimal, &PriceLevel)> {
        self.levels.iter().map(|(price, level)| (*price, level))
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
