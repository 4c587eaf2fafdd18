//! dominion-ops engine library.
//!
//! Exposes the dominion model, the espionage operation resolver, storage,
//! simulation and protocol modules for use by integration tests and the
//! binary entry point.

pub mod dominion;
pub mod engine;
pub mod ops;
pub mod protocol;
pub mod simulate;
pub mod store;
