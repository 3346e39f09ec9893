//! Data Transfer Objects (DTOs) for the poll server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: room events exchanged over WebSocket
//! - `http`: HTTP API request/response bodies
//! - `conversion`: conversion between DTOs and domain/usecase types

pub mod conversion;
pub mod http;
pub mod websocket;
