//! Matching logic module
//!
//! Implements price-time priority matching.

pub mod core;
pub mod crossing;

pub use core::{Done, MatchOutcome, MatchingCore};
pub use crossing::crosses;
