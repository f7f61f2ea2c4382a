//! Parked stop-limit orders
//!
//! Two ordered maps keyed by stop price, one per side, scanned after every
//! trade. A buy stop triggers when the last trade price reaches or exceeds
//! its stop price; a sell stop when the last trade price falls to or below
//! its stop price. Within one scan, triggered stops come out
//! nearest-to-price first: buy stops by ascending stop price, sell stops by
//! descending stop price.

use std::collections::{BTreeMap, VecDeque};
use types::decimal::Decimal;
use types::ids::OrderId;
use types::order::Side;

/// Table of parked stop-limit orders.
#[derive(Debug, Clone, Default)]
pub struct StopBook {
    buy: BTreeMap<Decimal, VecDeque<OrderId>>,
    sell: BTreeMap<Decimal, VecDeque<OrderId>>,
    count: usize,
}

impl StopBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a stop order under its trigger price.
    pub fn park(&mut self, side: Side, stop_price: Decimal, order_id: OrderId) {
        self.side_map_mut(side)
            .entry(stop_price)
            .or_default()
            .push_back(order_id);
        self.count += 1;
    }

    /// Remove a parked stop order.
    pub fn remove(&mut self, side: Side, stop_price: Decimal, order_id: &OrderId) -> bool {
        let map = self.side_map_mut(side);
        if let Some(queue) = map.get_mut(&stop_price) {
            if let Some(position) = queue.iter().position(|id| id == order_id) {
                queue.remove(position);
                if queue.is_empty() {
                    map.remove(&stop_price);
                }
                self.count -= 1;
                return true;
            }
        }
        false
    }

    /// Drain every stop whose trigger condition holds at `last_trade_price`.
    ///
    /// Buy stops come out in ascending stop-price order, then sell stops in
    /// descending stop-price order; FIFO within one stop price.
    pub fn take_triggered(&mut self, last_trade_price: Decimal) -> Vec<OrderId> {
        let mut triggered = Vec::new();

        let buy_prices: Vec<Decimal> = self
            .buy
            .range(..=last_trade_price)
            .map(|(price, _)| *price)
            .collect();
        for price in buy_prices {
            if let Some(queue) = self.buy.remove(&price) {
                self.count -= queue.len();
                triggered.extend(queue);
            }
        }

        let sell_prices: Vec<Decimal> = self
            .sell
            .range(last_trade_price..)
            .rev()
            .map(|(price, _)| *price)
            .collect();
        for price in sell_prices {
            if let Some(queue) = self.sell.remove(&price) {
                self.count -= queue.len();
                triggered.extend(queue);
            }
        }

        triggered
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, VecDeque<OrderId>> {
        match side {
            Side::Buy => &mut self.buy,
            Side::Sell => &mut self.sell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_buy_stop_triggers_at_or_above() {
        let mut stops = StopBook::new();
        stops.park(Side::Buy, d("100"), OrderId::new("s1"));
        stops.park(Side::Buy, d("105"), OrderId::new("s2"));

        assert!(stops.take_triggered(d("99")).is_empty());

        let triggered = stops.take_triggered(d("100"));
        assert_eq!(triggered, vec![OrderId::new("s1")]);
        assert_eq!(stops.len(), 1);
    }

    #[test]
    fn test_sell_stop_triggers_at_or_below() {
        let mut stops = StopBook::new();
        stops.park(Side::Sell, d("95"), OrderId::new("s1"));
        stops.park(Side::Sell, d("90"), OrderId::new("s2"));

        assert!(stops.take_triggered(d("96")).is_empty());

        let triggered = stops.take_triggered(d("95"));
        assert_eq!(triggered, vec![OrderId::new("s1")]);
    }

    #[test]
    fn test_trigger_order_nearest_first() {
        let mut stops = StopBook::new();
        stops.park(Side::Buy, d("102"), OrderId::new("b-far"));
        stops.park(Side::Buy, d("100"), OrderId::new("b-near"));
        stops.park(Side::Sell, d("98"), OrderId::new("s-far"));
        stops.park(Side::Sell, d("100"), OrderId::new("s-near"));

        // Everything triggers at 200 for buys; nothing for sells
        let triggered = stops.take_triggered(d("200"));
        assert_eq!(
            triggered,
            vec![OrderId::new("b-near"), OrderId::new("b-far")]
        );

        // Sell stops at 98 and 100 both trigger at 90, descending order
        let triggered = stops.take_triggered(d("90"));
        assert_eq!(
            triggered,
            vec![OrderId::new("s-near"), OrderId::new("s-far")]
        );
        assert!(stops.is_empty());
    }

    #[test]
    fn test_fifo_within_same_stop_price() {
        let mut stops = StopBook::new();
        stops.park(Side::Buy, d("100"), OrderId::new("first"));
        stops.park(Side::Buy, d("100"), OrderId::new("second"));

        let triggered = stops.take_triggered(d("101"));
        assert_eq!(triggered, vec![OrderId::new("first"), OrderId::new("second")]);
    }

    #[test]
    fn test_remove_parked_stop() {
        let mut stops = StopBook::new();
        stops.park(Side::Buy, d("100"), OrderId::new("s1"));

        assert!(stops.remove(Side::Buy, d("100"), &OrderId::new("s1")));
        assert!(!stops.remove(Side::Buy, d("100"), &OrderId::new("s1")));
        assert!(stops.is_empty());
    }
}
