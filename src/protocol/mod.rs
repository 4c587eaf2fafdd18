//! Text protocol handling.
//!
//! Implements the line-oriented command parser driven by the main loop and
//! the compact one-line notation used to describe dominions.

pub mod notation;
pub mod parser;

pub use notation::{encode_notation, parse_notation, NotationError};
pub use parser::{parse_command, Command, SimulateParams};
