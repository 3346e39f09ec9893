//! インフラストラクチャ層
//!
//! ドメイン層のインターフェースの具体的な実装と、ワイヤ形式の DTO を提供します。

pub mod capability;
pub mod directory;
pub mod dto;
pub mod message_pusher;
pub mod store;
