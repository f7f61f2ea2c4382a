//! Crossing detection logic
//!
//! Determines when a taker can fill against a resting price level.

use types::decimal::Decimal;
use types::order::Side;

/// Check whether a taker may fill against a maker level.
///
/// A taker with no limit (market order) crosses everything. A buy limit
/// crosses levels priced at or below its limit; a sell limit crosses levels
/// priced at or above its limit.
pub fn crosses(taker_side: Side, taker_limit: Option<Decimal>, maker_price: Decimal) -> bool {
    match taker_limit {
        None => true,
        Some(limit) => match taker_side {
            Side::Buy => maker_price <= limit,
            Side::Sell => maker_price >= limit,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_market_crosses_everything() {
        assert!(crosses(Side::Buy, None, d("50000")));
        assert!(crosses(Side::Sell, None, d("1")));
    }

    #[test]
    fn test_buy_limit_crossing() {
        assert!(crosses(Side::Buy, Some(d("100")), d("99")));
        assert!(crosses(Side::Buy, Some(d("100")), d("100")));
        assert!(!crosses(Side::Buy, Some(d("100")), d("101")));
    }

    #[test]
    fn test_sell_limit_crossing() {
        assert!(crosses(Side::Sell, Some(d("100")), d("101")));
        assert!(crosses(Side::Sell, Some(d("100")), d("100")));
        assert!(!crosses(Side::Sell, Some(d("100")), d("99")));
    }
}
