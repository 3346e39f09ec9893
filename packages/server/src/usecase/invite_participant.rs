//! UseCase: 管理者による参加者の招待
//!
//! ディレクトリに登録された参加者を、接続を待たずにセッションへ追加します。
//! 管理者トークンでのみ実行でき、追加はルームにブロードキャストされます。

use std::sync::Arc;

use crate::{
    domain::{MessagePusher, ParticipantId, PollId, PollSession},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    error::PollError, poll_session::PollSessionManager, room, session_lock::SessionLocks,
};

/// 参加者招待のユースケース
pub struct InviteParticipantUseCase {
    sessions: Arc<PollSessionManager>,
    message_pusher: Arc<dyn MessagePusher>,
    locks: Arc<SessionLocks>,
}

impl InviteParticipantUseCase {
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

    /// 参加者を招待する
    ///
    /// # Arguments
    ///
    /// * `token` - 作成時に発行された管理者トークン
    /// * `poll_id` - 招待先のポーリング
    /// * `participant_id` - 招待する参加者（ディレクトリで解決できること）
    pub async fn execute(
        &self,
        token: &str,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<PollSession, PollError> {
        let capability = self.sessions.verify_capability(token)?;
        if !capability.is_admin() || capability.poll_id != *poll_id {
            return Err(PollError::Unauthorized(
                "admin privileges required".to_string(),
            ));
        }

        let result = self.invite_locked(&capability.admin_id, poll_id, participant_id).await;
        // 接続のないポーリングへの招待でロックを残さない
        self.locks.prune(poll_id);
        let (poll, delivered) = result?;

        tracing::info!(
            "'{}' invited to poll '{}' ({} connection(s) notified)",
            participant_id,
            poll_id,
            delivered
        );
        Ok(poll)
    }

    async fn invite_locked(
        &self,
        admin_id: &ParticipantId,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<(PollSession, usize), PollError> {
        let _guard = self.locks.lock(poll_id).await;

        let poll = self.sessions.get(poll_id).await?;
        if !poll.is_created_by(admin_id) {
            return Err(PollError::Unauthorized(
                "admin privileges required".to_string(),
            ));
        }

        let update = self.sessions.add_participant(poll_id, participant_id).await?;
        let event = ServerEvent::PollUpdated {
            poll: (&update.poll).into(),
            message: update.message,
        };
        let delivered = room::broadcast(self.message_pusher.as_ref(), poll_id, &event).await?;
        Ok((update.poll, delivered))
    }
}
