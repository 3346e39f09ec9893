//! Utilities shared by the Hiroba crates: logging setup and clocks.

pub mod logger;
pub mod time;
