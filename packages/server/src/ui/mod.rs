//! HTTP / WebSocket surface of the poll server.

mod handler;
mod server;
mod signal;
pub mod state;

pub use handler::{POLL_SIGNATURE_HEADER, USER_ID_HEADER};
pub use server::Server;
pub use signal::shutdown_signal;
