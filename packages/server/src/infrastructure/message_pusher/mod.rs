//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! このモジュールは `MessagePusher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `websocket`: WebSocket を使った実装（単一プロセス内のルーム）
//! - 将来的に: `redis` pub/sub などによる複数ノード間のファンアウト

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
