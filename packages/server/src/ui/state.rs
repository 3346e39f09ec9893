//! Server state shared by the handlers.

use std::sync::Arc;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, HandlePollCommandUseCase,
    InviteParticipantUseCase, PollSessionManager,
};

/// Shared application state
pub struct AppState {
    /// PollSessionManager（HTTP API から直接使うセッション操作）
    pub sessions: Arc<PollSessionManager>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// HandlePollCommandUseCase（ルーム内コマンドのユースケース）
    pub handle_poll_command_usecase: Arc<HandlePollCommandUseCase>,
    /// InviteParticipantUseCase（管理者による招待のユースケース）
    pub invite_participant_usecase: Arc<InviteParticipantUseCase>,
}
