//! Trade records produced by matching
//!
//! Each match produces two entries, one per party, both priced at the
//! maker's resting price. Trades reference orders by id only; the book
//! resolves identity through its own index.

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::ids::{OrderId, UserId};
use crate::order::Role;

/// One party's view of a single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub role: Role,
    /// Execution price, always the maker's resting price.
    pub price: Decimal,
    /// Whether the quantity of this party's order is quote-denominated.
    pub is_quote: bool,
    /// Filled quantity in the base currency.
    pub quantity: Decimal,
}

impl Trade {
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        role: Role,
        price: Decimal,
        is_quote: bool,
        quantity: Decimal,
    ) -> Self {
        Self {
            order_id,
            user_id,
            role,
            price,
            is_quote,
            quantity,
        }
    }
}
