//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - トークン検証、ルームへの参加、参加者の追加、ブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 不正なトークンや偽の参加者 ID でルームに入れないことを保証
//! - 新しい参加者を含む全員が同じ状態を受け取ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：管理者・参加者の接続、同じ参加者の複数接続
//! - 異常系：不正なトークン、トークンと一致しない X-User-Id、存在しないポーリング
//! - エッジケース：失敗した接続がルームに残らないこと

use std::sync::Arc;

use crate::{
    domain::{ConnectionIdFactory, MessagePusher, ParticipantId, PusherChannel},
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    error::PollError, poll_command::ConnectionContext, poll_session::PollSessionManager, room,
    session_lock::SessionLocks,
};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    sessions: Arc<PollSessionManager>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    locks: Arc<SessionLocks>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
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

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `token` - ハンドシェイクで提示されたケーパビリティトークン
    /// * `claimed_identity` - `X-User-Id` ヘッダーの値（指定された場合はトークンと一致が必要）
    /// * `sender` - 接続へのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectionContext)` - 接続成功
    /// * `Err(PollError)` - 接続失敗（ルームには参加していない）
    pub async fn execute(
        &self,
        token: &str,
        claimed_identity: Option<ParticipantId>,
        sender: PusherChannel,
    ) -> Result<ConnectionContext, PollError> {
        // 1. トークン検証
        let capability = self.sessions.verify_capability(token)?;
        if let Some(claimed) = claimed_identity
            && claimed != capability.identity
        {
            return Err(PollError::Unauthorized(format!(
                "'{}' does not match the identity in the capability token",
                claimed
            )));
        }

        let poll_id = capability.poll_id.clone();
        let _guard = self.locks.lock(&poll_id).await;

        // 2. トークンの管理者とセッションの作成者を照合
        let poll = self.sessions.get(&poll_id).await?;
        if !poll.is_created_by(&capability.admin_id) {
            return Err(PollError::Unauthorized(
                "capability token was not issued for this poll".to_string(),
            ));
        }

        // 3. ルームに参加してから参加者を追加（失敗したらルームから外す）
        let context = ConnectionContext::new(
            ConnectionIdFactory::generate(),
            capability,
            token.to_string(),
        );
        self.message_pusher
            .join_room(&poll_id, context.connection_id.clone(), sender)
            .await;

        let update = match self
            .sessions
            .add_participant(&poll_id, &context.participant_id)
            .await
        {
            Ok(update) => update,
            Err(e) => {
                self.message_pusher
                    .leave_room(&poll_id, &context.connection_id)
                    .await;
                return Err(e);
            }
        };

        // 4. 新しい参加者を含むルーム全体にブロードキャスト
        let event = ServerEvent::PollUpdated {
            poll: (&update.poll).into(),
            message: update.message,
        };
        let delivered = room::broadcast(self.message_pusher.as_ref(), &poll_id, &event).await?;

        tracing::info!(
            "'{}' joined poll '{}' as connection '{}' (admin: {}, {} connection(s) notified)",
            context.participant_id,
            poll_id,
            context.connection_id,
            context.is_admin(),
            delivered
        );

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::{
        error::ErrorKind,
        test_support::{TestRoom, id},
    };
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_connect_admin_and_participant() {
        // テスト項目: 管理者と参加者が接続でき、参加者の追加が全員にブロードキャストされる
        // given (前提条件):
        let room = TestRoom::new().await;

        // when (操作):
        let mut admin = room.connect_admin().await;
        let mut alice = room.connect("alice").await;

        // then (期待する結果):
        assert!(admin.context.is_admin());
        assert!(!alice.context.is_admin());
        assert_eq!(alice.context.participant_id, id("alice"));
        assert_eq!(room.pusher.room_size(&room.poll_id).await, 2);
        for connection in [&mut admin, &mut alice] {
            match connection.last_event() {
                ServerEvent::PollUpdated { poll, message } => {
                    assert_eq!(poll.participants.len(), 2);
                    assert_eq!(poll.participants.get("alice").map(String::as_str), Some("Alice"));
                    assert_eq!(message.as_deref(), Some("@Alice joined your poll"));
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_same_participant_can_open_multiple_connections() {
        // テスト項目: 同じ参加者が複数の接続（タブ）で参加できる
        // given (前提条件):
        let room = TestRoom::new().await;

        // when (操作):
        let first = room.connect("alice").await;
        let second = room.connect("alice").await;

        // then (期待する結果):
        assert_ne!(first.context.connection_id, second.context.connection_id);
        assert_eq!(room.pusher.room_size(&room.poll_id).await, 2);
    }

    #[tokio::test]
    async fn test_connect_with_invalid_token_is_unauthorized() {
        // テスト項目: 不正なトークンでは接続できず、ルームにも参加しない
        // given (前提条件):
        let room = TestRoom::new().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = room.connect_usecase.execute("not-a-token", None, tx).await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(room.pusher.room_size(&room.poll_id).await, 0);
    }

    #[tokio::test]
    async fn test_connect_with_mismatched_header_is_unauthorized() {
        // テスト項目: X-User-Id がトークン内の ID と異なる場合は接続できない
        // given (前提条件):
        let room = TestRoom::new().await;
        let token = room
            .sessions
            .issue_join_token(&room.poll_id, &id("alice"))
            .await
            .unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作): alice のトークンで admin を名乗る
        let result = room
            .connect_usecase
            .execute(&token, Some(id("admin")), tx)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        assert!(room.sessions.get(&room.poll_id).await.unwrap().participants.is_empty());
    }

    #[tokio::test]
    async fn test_connect_to_ended_poll_is_not_found() {
        // テスト項目: 終了したポーリングへの接続は NotFound で、ルームに残らない
        // given (前提条件):
        let room = TestRoom::new().await;
        room.sessions.end(&room.poll_id).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = room
            .connect_usecase
            .execute(&room.admin_token, None, tx)
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(room.pusher.room_size(&room.poll_id).await, 0);
    }
}
