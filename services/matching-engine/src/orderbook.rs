//! Per-symbol order book
//!
//! The public entry point for one trading pair. Owns the two side books,
//! the stop table, the order index, and the buyer cache; routes submissions
//! by kind, activates triggered stops, enforces time-in-force, and derives
//! receipts from match results.

use std::collections::HashMap;

use tracing::{debug, warn};
use types::decimal::Decimal;
use types::errors::{BookError, EngineError, OrderError};
use types::ids::{OrderId, Symbol};
use types::order::{Order, OrderKind, Role, Side, Tif};

use crate::book::{AskBook, BidBook, StopBook};
use crate::cache::{BuyerCache, DEFAULT_CACHE_CAPACITY};
use crate::matching::{Done, MatchOutcome, MatchingCore};
use crate::receipt::{BuyerPos, Receipt};

/// Tunables of a single order book.
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Capacity of the buyer-position cache.
    pub buyer_cache_capacity: usize,
    /// When enabled, a taker crossing its own resting order cancels the
    /// resting order; when disabled such a submission is rejected.
    pub self_match_guard: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            buyer_cache_capacity: DEFAULT_CACHE_CAPACITY,
            self_match_guard: true,
        }
    }
}

/// Everything produced by one submission.
///
/// The public contract is `(done, receipts)`; the remaining fields carry
/// the lifecycle transitions the event layer reports.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub done: Done,
    pub receipts: Vec<Receipt>,
    /// Snapshot of the submitted order after processing.
    pub order: Order,
    /// Stop-limit orders activated by this submission, post-matching.
    pub activated: Vec<Order>,
    /// Orders canceled as a side effect (self-match guard, OCO links).
    pub canceled: Vec<Order>,
}

/// Order book for a single symbol. Single-writer: all mutations flow
/// through one logical owner.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    /// Index of live orders: resting limits and parked stops.
    orders: HashMap<OrderId, Order>,
    bids: BidBook,
    asks: AskBook,
    stops: StopBook,
    cache: BuyerCache,
    core: MatchingCore,
    last_trade_price: Option<Decimal>,
}

impl OrderBook {
    pub fn new(symbol: Symbol, config: BookConfig) -> Self {
        Self {
            symbol,
            orders: HashMap::new(),
            bids: BidBook::new(),
            asks: AskBook::new(),
            stops: StopBook::new(),
            cache: BuyerCache::new(config.buyer_cache_capacity),
            core: MatchingCore::new(config.self_match_guard),
            last_trade_price: None,
        }
    }

    pub fn with_defaults(symbol: Symbol) -> Self {
        Self::new(symbol, BookConfig::default())
    }

    /// Submit an order.
    ///
    /// Rejections (canceled order, non-positive quantity, duplicate id)
    /// surface as errors; domain outcomes such as an unfillable FOK are
    /// reported through the [`Done`].
    pub fn process(&mut self, order: Order) -> Result<ProcessOutcome, EngineError> {
        if order.is_canceled() {
            return Err(BookError::OrderCanceled(order.id.clone()).into());
        }
        if !order.quantity_original.is_positive() {
            return Err(
                OrderError::InvalidQuantity(order.quantity_original.to_string()).into(),
            );
        }
        if self.orders.contains_key(&order.id) {
            return Err(BookError::DuplicateId(order.id.clone()).into());
        }

        // Stop-limit orders park until their trigger price trades.
        if order.is_stop_limit() {
            let stop_price = order.stop_price.ok_or_else(|| {
                EngineError::Invariant(format!("stop order {} without stop price", order.id))
            })?;
            self.stops.park(order.side, stop_price, order.id.clone());
            self.orders.insert(order.id.clone(), order.clone());
            debug!(order_id = %order.id, stop = %stop_price, "stop-limit parked");
            return Ok(ProcessOutcome {
                done: Done::parked(order.quantity_original),
                receipts: Vec::new(),
                order,
                activated: Vec::new(),
                canceled: Vec::new(),
            });
        }

        let mut receipts = Vec::new();
        let mut canceled = Vec::new();

        let mut taker = order;
        let mut done = self.run_segment(&mut taker, &mut receipts, &mut canceled)?;

        // Reactivate triggered stops; their trades join the same Done, in
        // activation order, after the triggering taker. Activation may
        // cascade when those fills move the last trade price again.
        let mut activated = Vec::new();
        loop {
            let Some(last) = self.last_trade_price else {
                break;
            };
            let triggered = self.stops.take_triggered(last);
            if triggered.is_empty() {
                break;
            }
            for id in triggered {
                // An OCO link may have canceled it inside this pass.
                let Some(mut stop_order) = self.orders.remove(&id) else {
                    continue;
                };
                stop_order.activate();
                debug!(order_id = %stop_order.id, "stop-limit activated");
                self.cancel_linked(&stop_order, &mut canceled);

                let segment = self.run_segment(&mut stop_order, &mut receipts, &mut canceled)?;
                done.trades.extend(segment.trades);
                activated.push(stop_order);
            }
        }

        Ok(ProcessOutcome {
            done,
            receipts,
            order: taker,
            activated,
            canceled,
        })
    }

    /// Cancel a live order.
    ///
    /// Returns `Ok(None)` when the order is unknown or already terminal.
    /// A resting buy with fills in flight is refused: its settlement path
    /// depends on the coalesced receipt.
    pub fn cancel(&mut self, order_id: &OrderId) -> Result<Option<Order>, EngineError> {
        if !self.orders.contains_key(order_id) {
            return Ok(None);
        }
        if let Some(pos) = self.cache.get(order_id) {
            if pos.has_fills() {
                return Err(BookError::PartialFillCannotCancel(order_id.clone()).into());
            }
        }
        Ok(self.remove_order(order_id))
    }

    /// Read-only lookup of a live order.
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// The symbol this book trades, as "BASE/QUOTE".
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Top-of-book depth snapshot: (bids, asks), best first.
    pub fn depth(&self, levels: usize) -> (Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>) {
        (
            self.bids.depth_snapshot(levels),
            self.asks.depth_snapshot(levels),
        )
    }

    /// Price of the most recent trade.
    pub fn last_trade_price(&self) -> Option<Decimal> {
        self.last_trade_price
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &BuyerCache {
        &self.cache
    }

    /// Match one taker, store its residual, and settle the bookkeeping
    /// that every segment shares: last price, cache upkeep for canceled
    /// makers, OCO links, and receipt derivation.
    fn run_segment(
        &mut self,
        taker: &mut Order,
        receipts: &mut Vec<Receipt>,
        canceled: &mut Vec<Order>,
    ) -> Result<Done, EngineError> {
        let (done, outcome) =
            self.core
                .execute(taker, &mut self.orders, &mut self.bids, &mut self.asks)?;

        if done.stored {
            let price = taker.price.ok_or_else(|| {
                EngineError::Invariant(format!("resting order {} without price", taker.id))
            })?;
            match taker.side {
                Side::Buy => {
                    self.bids
                        .insert(price, taker.id.clone(), taker.quantity_remaining)
                }
                Side::Sell => {
                    self.asks
                        .insert(price, taker.id.clone(), taker.quantity_remaining)
                }
            }
            self.orders.insert(taker.id.clone(), taker.clone());
        }

        if let Some(trade) = done.trades.last() {
            self.last_trade_price = Some(trade.price);
        }

        let MatchOutcome {
            canceled_makers,
            completed_makers,
            ..
        } = outcome;

        for maker in &canceled_makers {
            self.cache.remove(&maker.id);
        }
        for maker in &completed_makers {
            self.cancel_linked(maker, canceled);
        }
        canceled.extend(canceled_makers);

        self.derive_receipts(taker, &done, receipts);

        if taker.is_filled() {
            self.cancel_linked(taker, canceled);
        }

        Ok(done)
    }

    /// Translate one segment's Done into receipts, per the completing-path
    /// rules: market buys always get one; resting limit buys coalesce
    /// through the cache; sells complete the resting buyers they fill.
    fn derive_receipts(&mut self, submitted: &Order, done: &Done, receipts: &mut Vec<Receipt>) {
        match (submitted.side, submitted.kind) {
            (Side::Buy, OrderKind::Market) => {
                receipts.push(Receipt {
                    user_id: submitted.user_id.clone(),
                    order_id: submitted.id.clone(),
                    trades: done.trades.clone(),
                    filled_qty: done.processed,
                });
                if done.left.is_positive() {
                    warn!(
                        user = %submitted.user_id,
                        order_id = %submitted.id,
                        requested = %submitted.quantity_original,
                        filled = %done.processed,
                        left = %done.left,
                        "market buy partially filled due to low liquidity"
                    );
                }
            }
            (Side::Buy, OrderKind::Limit) => {
                let mut pos = BuyerPos::new(submitted.clone());
                for trade in done.trades.iter().filter(|t| t.order_id != submitted.id) {
                    pos.apply(trade.clone());
                }
                if pos.is_complete() {
                    receipts.push(pos.into_receipt());
                } else {
                    match submitted.effective_tif() {
                        Tif::Gtc => {
                            self.cache.insert(submitted.id.clone(), pos);
                        }
                        Tif::Ioc => {
                            if done.processed.is_positive() {
                                receipts.push(Receipt {
                                    user_id: submitted.user_id.clone(),
                                    order_id: submitted.id.clone(),
                                    trades: pos.trades,
                                    filled_qty: done.processed,
                                });
                            }
                        }
                        // Unfillable FOK produced no trades and gets no receipt.
                        Tif::Fok => {}
                    }
                }
            }
            (Side::Sell, _) => {
                for trade in done.trades.iter().filter(|t| t.role == Role::Maker) {
                    let Some(mut pos) = self.cache.remove(&trade.order_id) else {
                        continue;
                    };
                    pos.apply(trade.clone());
                    if pos.is_complete() {
                        receipts.push(pos.into_receipt());
                    } else {
                        self.cache.insert(trade.order_id.clone(), pos);
                    }
                }
            }
            // Stop-limits never reach receipt derivation unactivated.
            (Side::Buy, OrderKind::StopLimit) => {}
        }
    }

    /// Cancel the OCO partner of an order that fully filled or activated.
    fn cancel_linked(&mut self, order: &Order, canceled: &mut Vec<Order>) {
        let Some(oco_id) = order.oco.clone() else {
            return;
        };
        if let Some(linked) = self.remove_order(&oco_id) {
            debug!(order_id = %order.id, linked = %oco_id, "canceled linked order");
            canceled.push(linked);
        }
    }

    /// Remove a live order from every structure it can rest in, marking it
    /// canceled.
    fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let mut order = self.orders.remove(order_id)?;
        match order.kind {
            OrderKind::Limit => {
                if let Some(price) = order.price {
                    match order.side {
                        Side::Buy => self.bids.remove(order_id, price),
                        Side::Sell => self.asks.remove(order_id, price),
                    };
                }
            }
            OrderKind::StopLimit => {
                if let Some(stop_price) = order.stop_price {
                    self.stops.remove(order.side, stop_price, order_id);
                }
            }
            OrderKind::Market => {}
        }
        self.cache.remove(order_id);
        order.cancel();
        Some(order)
    }
}
