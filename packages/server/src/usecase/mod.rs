//! UseCase 層
//!
//! - `PollSessionManager`: セッションドキュメントのライフサイクル
//! - `ConnectParticipantUseCase` / `DisconnectParticipantUseCase`: ルームへの参加と退出
//! - `HandlePollCommandUseCase`: ルーム内のコマンド処理
//! - `InviteParticipantUseCase`: 管理者による参加者の招待
//!
//! ルームに関わるユースケースは `SessionLocks` でポーリングごとに直列化されます。

pub mod config;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod invite_participant;
pub mod poll_command;
pub mod poll_session;
mod room;
pub mod session_lock;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, PollsConfig};
pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{ErrorKind, PollError};
pub use invite_participant::InviteParticipantUseCase;
pub use poll_command::{CommandOutcome, ConnectionContext, HandlePollCommandUseCase, PollCommand};
pub use poll_session::{PollSessionManager, PollUpdate};
pub use session_lock::SessionLocks;
