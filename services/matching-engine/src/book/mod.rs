//! Order book infrastructure module
//!
//! Contains price levels, the two side books, and the stop table.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;
pub mod stop_book;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;
pub use stop_book::StopBook;
