//! Live poll server library.
//!
//! Participants join a shared poll session over WebSocket, submit nominations
//! and ranked preferences, and every connected party sees the same state after
//! each change. Sessions live in an expiring document store; admin operations
//! are gated by signed capability tokens.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
