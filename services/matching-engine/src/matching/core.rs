//! Taker execution against resting liquidity
//!
//! Runs one validated taker order against the opposing side book and
//! produces a [`Done`] report. All tie-breaks are FIFO within a price
//! level; arrival order is the only ordering source.

use std::collections::HashMap;

use tracing::debug;
use types::decimal::Decimal;
use types::errors::{BookError, EngineError};
use types::ids::OrderId;
use types::order::{Order, Role, Side, Tif};
use types::trade::Trade;

use crate::book::{AskBook, BidBook, PriceLevel};
use crate::matching::crossing;

/// Per-submission summary produced by the matching core.
#[derive(Debug, Clone, PartialEq)]
pub struct Done {
    /// Quantity filled (quote terms for quote-denominated takers).
    pub processed: Decimal,
    /// Residual quantity after matching; `processed + left` equals the
    /// original quantity.
    pub left: Decimal,
    /// True iff the order came to rest in the book.
    pub stored: bool,
    /// Two entries per match, maker then taker, priced at the maker's price.
    pub trades: Vec<Trade>,
    pub partial: bool,
    pub partial_quantity_processed: Decimal,
}

impl Done {
    /// Report for an order that produced no trades and did not rest.
    pub fn unfilled(original: Decimal) -> Self {
        Self {
            processed: Decimal::ZERO,
            left: original,
            stored: false,
            trades: Vec::new(),
            partial: false,
            partial_quantity_processed: Decimal::ZERO,
        }
    }

    /// Report for a stop-limit order parked in the stop table.
    pub fn parked(original: Decimal) -> Self {
        Self {
            stored: true,
            ..Self::unfilled(original)
        }
    }
}

/// Result of executing one taker, including book maintenance side effects
/// the order book needs for cache, OCO, and event handling.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// Makers canceled by the self-match guard, already removed from the
    /// book and arena.
    pub canceled_makers: Vec<Order>,
    /// Makers fully filled by this execution, already removed from the book
    /// and arena.
    pub completed_makers: Vec<Order>,
}

/// Executes takers against resting liquidity.
///
/// `self_match_guard` selects the self-cross policy: when enabled (the
/// default) a resting order of the taker's own user is popped and canceled
/// without a trade; when disabled the whole submission fails with
/// [`BookError::SelfCrossBlocked`].
#[derive(Debug, Clone)]
pub struct MatchingCore {
    self_match_guard: bool,
}

impl MatchingCore {
    pub fn new(self_match_guard: bool) -> Self {
        Self { self_match_guard }
    }

    /// Execute `taker` against the opposing book.
    ///
    /// The taker must already be validated: non-canceled, positive original
    /// quantity, price present for limit orders. On return the taker's
    /// remaining quantity reflects its fills; residual storage is reported
    /// through [`Done::stored`] and performed by the order book.
    pub fn execute(
        &self,
        taker: &mut Order,
        arena: &mut HashMap<OrderId, Order>,
        bids: &mut BidBook,
        asks: &mut AskBook,
    ) -> Result<(Done, MatchOutcome), EngineError> {
        let original = taker.quantity_original;
        let mut opposing = match taker.side {
            Side::Buy => Opposing::Asks(asks),
            Side::Sell => Opposing::Bids(bids),
        };

        // FOK pre-flight: dry-run sum over opposing levels inside the price
        // constraint; if the book cannot fully fill, no trades occur.
        if taker.is_limit() && taker.effective_tif() == Tif::Fok {
            let fillable = opposing.fillable(taker.side, taker.price, taker.quantity_remaining);
            if fillable < taker.quantity_remaining {
                debug!(
                    order_id = %taker.id,
                    fillable = %fillable,
                    wanted = %taker.quantity_remaining,
                    "FOK order unfillable, no trades"
                );
                return Ok((Done::unfilled(original), MatchOutcome::default()));
            }
        }

        let mut trades = Vec::new();
        let mut outcome = MatchOutcome::default();
        self.fill_loop(taker, arena, &mut opposing, &mut trades, &mut outcome)?;

        let left = taker.quantity_remaining;
        let processed = original - left;
        let stored = taker.is_limit() && taker.effective_tif() == Tif::Gtc && left.is_positive();
        let partial = processed.is_positive() && left.is_positive();

        let done = Done {
            processed,
            left,
            stored,
            trades,
            partial,
            partial_quantity_processed: if partial { processed } else { Decimal::ZERO },
        };
        Ok((done, outcome))
    }

    fn fill_loop(
        &self,
        taker: &mut Order,
        arena: &mut HashMap<OrderId, Order>,
        opposing: &mut Opposing<'_>,
        trades: &mut Vec<Trade>,
        outcome: &mut MatchOutcome,
    ) -> Result<(), EngineError> {
        while taker.quantity_remaining.is_positive() {
            let Some(price) = opposing.best_price() else {
                break;
            };
            if !crossing::crosses(taker.side, taker.price, price) {
                break;
            }

            let Some(maker_id) = opposing.head_at(price) else {
                return Err(EngineError::Invariant(format!(
                    "empty price level at {price} left in book"
                )));
            };

            let maker = arena.get(&maker_id).ok_or_else(|| {
                EngineError::Invariant(format!("order {maker_id} in level but not in index"))
            })?;

            if maker.is_canceled() {
                opposing.pop_head(price);
                arena.remove(&maker_id);
                continue;
            }

            if maker.user_id == taker.user_id {
                if !self.self_match_guard {
                    return Err(BookError::SelfCrossBlocked.into());
                }
                // Self-match guard: pop and cancel the resting order, no trade.
                opposing.pop_head(price);
                let mut maker = arena
                    .remove(&maker_id)
                    .expect("maker present in index above");
                maker.cancel();
                debug!(maker_id = %maker.id, taker_id = %taker.id, "self-match guard canceled maker");
                outcome.canceled_makers.push(maker);
                continue;
            }

            let maker_remaining = maker.quantity_remaining;
            let (fill, taker_spend) = if taker.is_quote {
                // Quote budget: buy as much base as the remaining quote
                // affords at this level, truncated so the budget is never
                // exceeded.
                let affordable = taker.quantity_remaining.div_floor(price)?;
                let fill = maker_remaining.min(affordable);
                if fill.is_zero() {
                    break;
                }
                let spend = fill.checked_mul(price)?;
                // Product rounding may overshoot the budget by one step.
                (fill, spend.min(taker.quantity_remaining))
            } else {
                let fill = taker.quantity_remaining.min(maker_remaining);
                (fill, fill)
            };

            let maker = arena
                .get_mut(&maker_id)
                .expect("maker present in index above");
            maker.set_role(Role::Maker);
            maker.decrement_remaining(fill)?;
            let maker_filled = maker.is_filled();
            trades.push(Trade::new(
                maker.id.clone(),
                maker.user_id.clone(),
                Role::Maker,
                price,
                maker.is_quote,
                fill,
            ));

            taker.set_role(Role::Taker);
            taker.decrement_remaining(taker_spend)?;
            trades.push(Trade::new(
                taker.id.clone(),
                taker.user_id.clone(),
                Role::Taker,
                price,
                taker.is_quote,
                fill,
            ));

            debug!(
                maker_id = %maker_id,
                taker_id = %taker.id,
                price = %price,
                quantity = %fill,
                "match"
            );

            opposing.fill_head(price, fill);
            if maker_filled {
                let maker = arena
                    .remove(&maker_id)
                    .expect("maker present in index above");
                outcome.completed_makers.push(maker);
            }
        }
        Ok(())
    }
}

/// Side-erased view of the book a taker executes against.
enum Opposing<'a> {
    Asks(&'a mut AskBook),
    Bids(&'a mut BidBook),
}

impl Opposing<'_> {
    fn best_price(&self) -> Option<Decimal> {
        match self {
            Opposing::Asks(book) => book.best_price(),
            Opposing::Bids(book) => book.best_price(),
        }
    }

    fn head_at(&mut self, price: Decimal) -> Option<OrderId> {
        self.level_mut(price)?
            .peek_head()
            .map(|(id, _)| id.clone())
    }

    fn pop_head(&mut self, price: Decimal) {
        if let Some(level) = self.level_mut(price) {
            level.pop_head();
        }
        self.drop_level_if_empty(price);
    }

    fn fill_head(&mut self, price: Decimal, delta: Decimal) {
        if let Some(level) = self.level_mut(price) {
            level.fill_head(delta);
        }
        self.drop_level_if_empty(price);
    }

    /// Dry-run sum of opposing liquidity inside the taker's price limit,
    /// stopping once `target` is reachable.
    fn fillable(&self, taker_side: Side, taker_limit: Option<Decimal>, target: Decimal) -> Decimal {
        let mut total = Decimal::ZERO;
        let fold = |total: &mut Decimal, price: Decimal, level: &PriceLevel| -> bool {
            if !crossing::crosses(taker_side, taker_limit, price) {
                return false;
            }
            *total = *total + level.aggregate_remaining();
            *total < target
        };
        match self {
            Opposing::Asks(book) => {
                for (price, level) in book.iter_best_first() {
                    if !fold(&mut total, price, level) {
                        break;
                    }
                }
            }
            Opposing::Bids(book) => {
                for (price, level) in book.iter_best_first() {
                    if !fold(&mut total, price, level) {
                        break;
                    }
                }
            }
        }
        total
    }

    fn level_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        match self {
            Opposing::Asks(book) => book.level_mut(price),
            Opposing::Bids(book) => book.level_mut(price),
        }
    }

    fn drop_level_if_empty(&mut self, price: Decimal) {
        match self {
            Opposing::Asks(book) => book.drop_level_if_empty(price),
            Opposing::Bids(book) => book.drop_level_if_empty(price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::order::Tif;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        arena: HashMap<OrderId, Order>,
        bids: BidBook,
        asks: AskBook,
        core: MatchingCore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: HashMap::new(),
                bids: BidBook::new(),
                asks: AskBook::new(),
                core: MatchingCore::new(true),
            }
        }

        fn rest_ask(&mut self, id: &str, user: &str, qty: &str, px: &str) {
            let order = Order::new_limit(
                OrderId::new(id),
                Side::Sell,
                d(qty),
                d(px),
                Tif::Gtc,
                UserId::new(user),
            )
            .unwrap();
            self.asks
                .insert(d(px), order.id.clone(), order.quantity_remaining);
            self.arena.insert(order.id.clone(), order);
        }

        fn rest_bid(&mut self, id: &str, user: &str, qty: &str, px: &str) {
            let order = Order::new_limit(
                OrderId::new(id),
                Side::Buy,
                d(qty),
                d(px),
                Tif::Gtc,
                UserId::new(user),
            )
            .unwrap();
            self.bids
                .insert(d(px), order.id.clone(), order.quantity_remaining);
            self.arena.insert(order.id.clone(), order);
        }

        fn execute(&mut self, taker: &mut Order) -> (Done, MatchOutcome) {
            self.core
                .execute(taker, &mut self.arena, &mut self.bids, &mut self.asks)
                .unwrap()
        }
    }

    #[test]
    fn test_market_buy_full_fill() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "seller", "5", "100");

        let mut taker =
            Order::new_market(OrderId::new("mb1"), Side::Buy, d("5"), UserId::new("buyer"))
                .unwrap();
        let (done, outcome) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("5"));
        assert_eq!(done.left, Decimal::ZERO);
        assert!(!done.stored);
        assert!(!done.partial);
        assert_eq!(done.trades.len(), 2);
        assert_eq!(done.trades[0].order_id.as_str(), "a1");
        assert_eq!(done.trades[0].role, Role::Maker);
        assert_eq!(done.trades[0].price, d("100"));
        assert_eq!(done.trades[1].role, Role::Taker);
        assert_eq!(outcome.completed_makers.len(), 1);
        assert!(fx.asks.is_empty());
        assert!(fx.arena.is_empty());
    }

    #[test]
    fn test_market_buy_partial_fill_discards_residual() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "seller", "3", "100");

        let mut taker =
            Order::new_market(OrderId::new("mb2"), Side::Buy, d("10"), UserId::new("buyer"))
                .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("3"));
        assert_eq!(done.left, d("7"));
        assert!(!done.stored);
        assert!(done.partial);
        assert_eq!(done.partial_quantity_processed, d("3"));
    }

    #[test]
    fn test_limit_buy_respects_price_limit() {
        let mut fx = Fixture::new();
        fx.rest_ask("cheap", "s1", "1", "100");
        fx.rest_ask("dear", "s2", "1", "105");

        let mut taker = Order::new_limit(
            OrderId::new("b1"),
            Side::Buy,
            d("2"),
            d("100"),
            Tif::Gtc,
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("1"));
        assert_eq!(done.left, d("1"));
        assert!(done.stored);
        // The expensive ask is untouched
        assert_eq!(fx.asks.best_price(), Some(d("105")));
    }

    #[test]
    fn test_best_price_first_then_fifo() {
        let mut fx = Fixture::new();
        fx.rest_ask("worse", "s1", "1", "101");
        fx.rest_ask("first", "s2", "1", "100");
        fx.rest_ask("second", "s3", "1", "100");

        let mut taker =
            Order::new_market(OrderId::new("mb"), Side::Buy, d("2"), UserId::new("buyer"))
                .unwrap();
        let (done, _) = fx.execute(&mut taker);

        let maker_ids: Vec<&str> = done
            .trades
            .iter()
            .filter(|t| t.role == Role::Maker)
            .map(|t| t.order_id.as_str())
            .collect();
        assert_eq!(maker_ids, vec!["first", "second"]);
        assert_eq!(fx.asks.best_price(), Some(d("101")));
    }

    #[test]
    fn test_sell_taker_walks_bids_down() {
        let mut fx = Fixture::new();
        fx.rest_bid("high", "b1", "1", "102");
        fx.rest_bid("low", "b2", "1", "100");

        let mut taker = Order::new_limit(
            OrderId::new("s1"),
            Side::Sell,
            d("2"),
            d("100"),
            Tif::Gtc,
            UserId::new("seller"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("2"));
        // Each fill executes at the maker's price
        assert_eq!(done.trades[0].price, d("102"));
        assert_eq!(done.trades[2].price, d("100"));
    }

    #[test]
    fn test_self_match_guard_cancels_maker() {
        let mut fx = Fixture::new();
        fx.rest_ask("own", "alice", "2", "100");
        fx.rest_ask("other", "bob", "2", "100");

        let mut taker =
            Order::new_market(OrderId::new("mb"), Side::Buy, d("2"), UserId::new("alice"))
                .unwrap();
        let (done, outcome) = fx.execute(&mut taker);

        // No trade against own order; it was popped and canceled
        assert_eq!(outcome.canceled_makers.len(), 1);
        assert_eq!(outcome.canceled_makers[0].id.as_str(), "own");
        assert!(outcome.canceled_makers[0].is_canceled());
        assert_eq!(done.processed, d("2"));
        assert!(done
            .trades
            .iter()
            .all(|t| t.user_id.as_str() != "alice" || t.role == Role::Taker));
    }

    #[test]
    fn test_self_match_disabled_rejects_submission() {
        let mut fx = Fixture::new();
        fx.core = MatchingCore::new(false);
        fx.rest_ask("own", "alice", "2", "100");

        let mut taker =
            Order::new_market(OrderId::new("mb"), Side::Buy, d("1"), UserId::new("alice"))
                .unwrap();
        let err = fx
            .core
            .execute(&mut taker, &mut fx.arena, &mut fx.bids, &mut fx.asks)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Book(BookError::SelfCrossBlocked)
        ));
    }

    #[test]
    fn test_fok_unfillable_leaves_book_unchanged() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "seller", "4", "100");

        let mut taker = Order::new_limit(
            OrderId::new("fok1"),
            Side::Buy,
            d("5"),
            d("100"),
            Tif::Fok,
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, Decimal::ZERO);
        assert_eq!(done.left, d("5"));
        assert!(!done.stored);
        assert!(done.trades.is_empty());
        assert_eq!(fx.asks.depth_snapshot(1), vec![(d("100"), d("4"))]);
    }

    #[test]
    fn test_fok_fillable_across_levels() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "s1", "3", "100");
        fx.rest_ask("a2", "s2", "3", "101");

        let mut taker = Order::new_limit(
            OrderId::new("fok2"),
            Side::Buy,
            d("5"),
            d("101"),
            Tif::Fok,
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("5"));
        assert_eq!(done.left, Decimal::ZERO);
    }

    #[test]
    fn test_quote_market_buy_spends_budget() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "seller", "10", "100");

        // 250 quote buys 2.5 base at 100
        let mut taker = Order::new_market_quote(
            OrderId::new("q1"),
            Side::Buy,
            d("250"),
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed, d("250"));
        assert_eq!(done.left, Decimal::ZERO);
        let maker_trade = &done.trades[0];
        assert_eq!(maker_trade.quantity, d("2.5"));
        // Maker keeps 7.5 resting
        assert_eq!(
            fx.arena[&OrderId::new("a1")].quantity_remaining,
            d("7.5")
        );
    }

    #[test]
    fn test_quote_market_buy_truncates_fill_to_budget() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "seller", "10", "3");

        // 10 / 3 = 3.33333333… base affordable, truncated at 8 digits
        let mut taker = Order::new_market_quote(
            OrderId::new("q2"),
            Side::Buy,
            d("10"),
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        let maker_trade = &done.trades[0];
        assert_eq!(maker_trade.quantity, d("3.33333333"));
        // Spent 9.99999999, residual below one price step is discarded
        assert_eq!(done.processed, d("9.99999999"));
        assert_eq!(done.left, d("0.00000001"));
        assert!(!done.stored);
    }

    #[test]
    fn test_conservation_processed_plus_left() {
        let mut fx = Fixture::new();
        fx.rest_ask("a1", "s1", "1.3", "100");
        fx.rest_ask("a2", "s2", "0.7", "101");

        let mut taker = Order::new_limit(
            OrderId::new("b1"),
            Side::Buy,
            d("3"),
            d("101"),
            Tif::Gtc,
            UserId::new("buyer"),
        )
        .unwrap();
        let (done, _) = fx.execute(&mut taker);

        assert_eq!(done.processed + done.left, d("3"));
        assert_eq!(done.processed, d("2"));
    }
}
