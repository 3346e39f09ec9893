//! セッションストアの実装
//!
//! - `inmemory`: プロセス内の HashMap を使った実装（有効期限付き）
//! - 将来的に: `redis` (RedisJSON) など

pub mod inmemory;

pub use inmemory::InMemorySessionStore;
