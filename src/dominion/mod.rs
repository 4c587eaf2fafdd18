//! Dominion representation.
//!
//! Contains the counter enumeration, race configuration for spy-capable
//! units, and the dominion snapshot the resolver operates on.

pub mod counter;
pub mod race;
pub mod state;

pub use counter::{Counter, ALL_COUNTERS, COUNTER_COUNT};
pub use race::{Race, SpyUnit, SPY_WEIGHT_PERMILLE};
pub use state::{Dominion, MAX_STRENGTH, STARTING_LAND, STARTING_PEASANTS};
