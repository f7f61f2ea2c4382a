//! Matching engine
//!
//! Deterministic price-time priority matching per symbol, with partial-fill
//! tracking for resting buyers and receipt derivation for completed fill
//! paths.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced; FIFO within a price level
//! - Deterministic matching (same inputs → same outputs, no timestamps)
//! - No trades between orders of one user
//! - Conservation: processed + left equals the original quantity

pub mod book;
pub mod cache;
pub mod events;
pub mod exchange;
pub mod matching;
pub mod orderbook;
pub mod receipt;

pub use events::BookEvent;
pub use exchange::{Exchange, ExchangeConfig};
pub use matching::{Done, MatchingCore};
pub use orderbook::{BookConfig, OrderBook, ProcessOutcome};
pub use receipt::{BuyerPos, Receipt};
