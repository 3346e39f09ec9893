//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - ルームからの退出、参加者の削除、残りの接続へのブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 切断した参加者がセッションから消えることを保証
//! - セッションが既に存在しない場合に不要なブロードキャストをしないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：ポーリング終了後の切断、最後の接続の切断

use std::sync::Arc;

use crate::{domain::MessagePusher, infrastructure::dto::websocket::ServerEvent};

use super::{
    error::PollError, poll_command::ConnectionContext, poll_session::PollSessionManager, room,
    session_lock::SessionLocks,
};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    sessions: Arc<PollSessionManager>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    locks: Arc<SessionLocks>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        sessions: Arc<PollSessionManager>,
        message_pusher: Arc<dyn MessagePusher>,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            sessions,
            message_pusher,
            locks,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - ルームに残った接続数
    /// * `Err(PollError)` - 退出の書き込みに失敗
    pub async fn execute(&self, context: &ConnectionContext) -> Result<usize, PollError> {
        let poll_id = &context.poll_id;
        let guard = self.locks.lock(poll_id).await;

        // 1. ルームから外す
        let remaining = self
            .message_pusher
            .leave_room(poll_id, &context.connection_id)
            .await;

        // 2. 参加者を削除し、残りの接続にブロードキャスト
        let result = match self.sessions.leave(poll_id, &context.participant_id).await {
            Ok(update) => {
                let event = ServerEvent::PollUpdated {
                    poll: (&update.poll).into(),
                    message: update.message,
                };
                room::broadcast(self.message_pusher.as_ref(), poll_id, &event)
                    .await
                    .map(|_| remaining)
            }
            // セッションが既に存在しない場合はブロードキャストしない
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    "Poll '{}' is gone, skipping leave broadcast for '{}'",
                    poll_id,
                    context.participant_id
                );
                Ok(remaining)
            }
            Err(e) => Err(e),
        };

        drop(guard);
        if remaining == 0 {
            self.locks.prune(poll_id);
        }

        tracing::info!(
            "'{}' disconnected from poll '{}' ({} connection(s) remaining)",
            context.participant_id,
            poll_id,
            remaining
        );
        result
    }
}
