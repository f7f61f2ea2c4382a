//! Order lifecycle types
//!
//! An order is immutable identity (id, owner, side, kind, price terms,
//! original quantity) plus mutable fill/cancel/role state. Every order is
//! handed to an order book exactly once and ends fully filled, resting,
//! canceled, or rejected.

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::errors::OrderError;
use crate::ids::{OrderId, UserId};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    #[serde(rename = "MARKET")]
    Market,
    #[serde(rename = "LIMIT")]
    Limit,
    #[serde(rename = "STOP-LIMIT")]
    StopLimit,
}

/// Time-in-force policy for limit orders
///
/// Market orders are implicitly IOC and carry no TIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tif {
    /// Good-Till-Cancel: residual rests on the book
    Gtc,
    /// Immediate-Or-Cancel: residual is discarded
    Ioc,
    /// Fill-Or-Kill: full match or no trades at all
    Fok,
}

/// Liquidity role, assigned once at first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Maker,
    Taker,
}

/// A single order
///
/// For quote-denominated market buys (`is_quote`), quantities are expressed
/// in the quote currency and the order fills until the quote budget is
/// exhausted or the book runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub side: Side,
    pub kind: OrderKind,
    /// Set for limit orders only.
    pub tif: Option<Tif>,
    /// Quantity denominated in the quote currency (market orders only).
    pub is_quote: bool,
    /// Limit price (limit and stop-limit orders).
    pub price: Option<Decimal>,
    /// Trigger price (stop-limit orders).
    pub stop_price: Option<Decimal>,
    pub quantity_original: Decimal,
    pub quantity_remaining: Decimal,
    pub canceled: bool,
    /// Linked order canceled when this one fully fills or activates.
    pub oco: Option<OrderId>,
    pub role: Option<Role>,
}

impl Order {
    /// Create a market order with quantity in the base currency.
    pub fn new_market(
        id: OrderId,
        side: Side,
        quantity: Decimal,
        user_id: UserId,
    ) -> Result<Self, OrderError> {
        Self::validate_quantity(quantity)?;
        Ok(Self {
            id,
            user_id,
            side,
            kind: OrderKind::Market,
            tif: None,
            is_quote: false,
            price: None,
            stop_price: None,
            quantity_original: quantity,
            quantity_remaining: quantity,
            canceled: false,
            oco: None,
            role: None,
        })
    }

    /// Create a market buy with quantity in the quote currency.
    pub fn new_market_quote(
        id: OrderId,
        side: Side,
        quantity: Decimal,
        user_id: UserId,
    ) -> Result<Self, OrderError> {
        let mut order = Self::new_market(id, side, quantity, user_id)?;
        order.is_quote = true;
        Ok(order)
    }

    /// Create a limit order.
    pub fn new_limit(
        id: OrderId,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        tif: Tif,
        user_id: UserId,
    ) -> Result<Self, OrderError> {
        Self::validate_quantity(quantity)?;
        Self::validate_price(price)?;
        Ok(Self {
            id,
            user_id,
            side,
            kind: OrderKind::Limit,
            tif: Some(tif),
            is_quote: false,
            price: Some(price),
            stop_price: None,
            quantity_original: quantity,
            quantity_remaining: quantity,
            canceled: false,
            oco: None,
            role: None,
        })
    }

    /// Create a stop-limit order that parks until its trigger price trades.
    pub fn new_stop_limit(
        id: OrderId,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        stop_price: Decimal,
        user_id: UserId,
    ) -> Result<Self, OrderError> {
        Self::validate_quantity(quantity)?;
        Self::validate_price(price)?;
        if !stop_price.is_positive() {
            return Err(OrderError::InvalidStopPrice(stop_price.to_string()));
        }
        Ok(Self {
            id,
            user_id,
            side,
            kind: OrderKind::StopLimit,
            tif: None,
            is_quote: false,
            price: Some(price),
            stop_price: Some(stop_price),
            quantity_original: quantity,
            quantity_remaining: quantity,
            canceled: false,
            oco: None,
            role: None,
        })
    }

    /// Link another order to be canceled when this one fills or activates.
    pub fn with_oco(mut self, oco: OrderId) -> Self {
        self.oco = Some(oco);
        self
    }

    /// Mark the order canceled. Idempotent; a canceled order never matches.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Assign the liquidity role. Settable once; later calls are no-ops.
    pub fn set_role(&mut self, role: Role) {
        if self.role.is_none() {
            self.role = Some(role);
        }
    }

    /// Reduce the remaining quantity by `delta`.
    pub fn decrement_remaining(&mut self, delta: Decimal) -> Result<(), OrderError> {
        if delta > self.quantity_remaining {
            return Err(OrderError::OverFill {
                remaining: self.quantity_remaining.to_string(),
                delta: delta.to_string(),
            });
        }
        self.quantity_remaining = self.quantity_remaining - delta;
        Ok(())
    }

    /// Convert a triggered stop-limit into a plain GTC limit order.
    pub fn activate(&mut self) {
        if self.kind == OrderKind::StopLimit {
            self.kind = OrderKind::Limit;
            self.tif = Some(Tif::Gtc);
        }
    }

    pub fn is_filled(&self) -> bool {
        self.quantity_remaining.is_zero()
    }

    /// Quantity processed so far.
    pub fn processed(&self) -> Decimal {
        self.quantity_original - self.quantity_remaining
    }

    pub fn is_market(&self) -> bool {
        self.kind == OrderKind::Market
    }

    pub fn is_limit(&self) -> bool {
        self.kind == OrderKind::Limit
    }

    pub fn is_stop_limit(&self) -> bool {
        self.kind == OrderKind::StopLimit
    }

    /// Effective time-in-force: market orders are implicitly IOC.
    pub fn effective_tif(&self) -> Tif {
        match self.kind {
            OrderKind::Market => Tif::Ioc,
            _ => self.tif.unwrap_or(Tif::Gtc),
        }
    }

    fn validate_quantity(quantity: Decimal) -> Result<(), OrderError> {
        if !quantity.is_positive() {
            return Err(OrderError::InvalidQuantity(quantity.to_string()));
        }
        Ok(())
    }

    fn validate_price(price: Decimal) -> Result<(), OrderError> {
        if !price.is_positive() {
            return Err(OrderError::InvalidPrice(price.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn limit(id: &str, side: Side, qty: &str, px: &str) -> Order {
        Order::new_limit(
            OrderId::new(id),
            side,
            d(qty),
            d(px),
            Tif::Gtc,
            UserId::new("u1"),
        )
        .unwrap()
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_limit_order_creation() {
        let order = limit("o1", Side::Buy, "10", "100");
        assert_eq!(order.kind, OrderKind::Limit);
        assert_eq!(order.quantity_remaining, d("10"));
        assert_eq!(order.processed(), Decimal::ZERO);
        assert!(!order.is_canceled());
        assert!(order.role.is_none());
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let err = Order::new_market(OrderId::new("o1"), Side::Buy, d("0"), UserId::new("u1"));
        assert!(matches!(err, Err(OrderError::InvalidQuantity(_))));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let err = Order::new_limit(
            OrderId::new("o1"),
            Side::Buy,
            d("1"),
            d("0"),
            Tif::Gtc,
            UserId::new("u1"),
        );
        assert!(matches!(err, Err(OrderError::InvalidPrice(_))));
    }

    #[test]
    fn test_rejects_non_positive_stop_price() {
        let err = Order::new_stop_limit(
            OrderId::new("o1"),
            Side::Buy,
            d("1"),
            d("100"),
            d("-1"),
            UserId::new("u1"),
        );
        assert!(matches!(err, Err(OrderError::InvalidStopPrice(_))));
    }

    #[test]
    fn test_cancel_idempotent() {
        let mut order = limit("o1", Side::Buy, "10", "100");
        order.cancel();
        order.cancel();
        assert!(order.is_canceled());
    }

    #[test]
    fn test_set_role_first_write_wins() {
        let mut order = limit("o1", Side::Buy, "10", "100");
        order.set_role(Role::Taker);
        order.set_role(Role::Maker);
        assert_eq!(order.role, Some(Role::Taker));
    }

    #[test]
    fn test_decrement_remaining() {
        let mut order = limit("o1", Side::Buy, "10", "100");
        order.decrement_remaining(d("4")).unwrap();
        assert_eq!(order.quantity_remaining, d("6"));
        assert_eq!(order.processed(), d("4"));

        let err = order.decrement_remaining(d("7"));
        assert!(matches!(err, Err(OrderError::OverFill { .. })));
        assert_eq!(order.quantity_remaining, d("6"));
    }

    #[test]
    fn test_market_is_implicitly_ioc() {
        let order = Order::new_market(OrderId::new("m1"), Side::Buy, d("1"), UserId::new("u1"))
            .unwrap();
        assert_eq!(order.effective_tif(), Tif::Ioc);
    }

    #[test]
    fn test_stop_limit_activation() {
        let mut order = Order::new_stop_limit(
            OrderId::new("s1"),
            Side::Buy,
            d("5"),
            d("102"),
            d("100"),
            UserId::new("u1"),
        )
        .unwrap();
        order.activate();
        assert_eq!(order.kind, OrderKind::Limit);
        assert_eq!(order.tif, Some(Tif::Gtc));
        assert_eq!(order.price, Some(d("102")));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = limit("o1", Side::Sell, "2.5", "3000.5").with_oco(OrderId::new("o2"));
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
