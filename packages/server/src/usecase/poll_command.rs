//! UseCase: ルーム内のコマンド処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - HandlePollCommandUseCase::execute() メソッド
//! - 管理者限定コマンドの認可、変更後のブロードキャスト、エラーの送信先
//!
//! ### なぜこのテストが必要か
//! - 管理者以外がポーリングを操作できないことを保証
//! - 変更のたびにルーム全体が同じ正規の状態を受け取ることを確認
//! - エラーが送信元だけに届き、ルームに漏れないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ノミネーション、開始、ランキング提出、集計、終了
//! - 異常系：参加者による管理者コマンド、なりすましのノミネーション、不正なランキング
//! - エッジケース：期限切れ後のコマンド（セッション終了として扱う）

use std::sync::Arc;

use crate::{
    domain::{
        ConnectionId, MessagePusher, NominationDescription, NominationId, ParticipantId, PollId,
        VerifiedCapability,
    },
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    error::PollError,
    poll_session::{PollSessionManager, PollUpdate},
    room,
    session_lock::SessionLocks,
};

/// ルーム内で受け付けるコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCommand {
    RemoveParticipant {
        participant_id: ParticipantId,
    },
    AddNomination {
        /// 指定された場合は接続者と一致しなければならない
        participant_id: Option<ParticipantId>,
        description: NominationDescription,
    },
    RemoveNomination {
        nomination_id: NominationId,
    },
    StartPoll,
    SubmitRankings {
        rankings: Vec<NominationId>,
    },
    ClosePoll,
    EndPoll,
}

impl PollCommand {
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            PollCommand::RemoveParticipant { .. }
                | PollCommand::RemoveNomination { .. }
                | PollCommand::StartPoll
                | PollCommand::ClosePoll
                | PollCommand::EndPoll
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PollCommand::RemoveParticipant { .. } => "remove-participant",
            PollCommand::AddNomination { .. } => "add-nomination",
            PollCommand::RemoveNomination { .. } => "remove-nomination",
            PollCommand::StartPoll => "start-poll",
            PollCommand::SubmitRankings { .. } => "submit-rankings",
            PollCommand::ClosePoll => "close-poll",
            PollCommand::EndPoll => "end-poll",
        }
    }
}

/// 接続ごとの認証済みコンテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub poll_id: PollId,
    pub poll_name: String,
    /// この接続の参加者 ID（トークンに埋め込まれたもの）
    pub participant_id: ParticipantId,
    pub admin_id: ParticipantId,
    /// 管理者トークンで接続したか
    pub admin_grant: bool,
    /// 管理者コマンドのたびに再検証するため保持する
    pub token: String,
}

impl ConnectionContext {
    pub fn new(connection_id: ConnectionId, capability: VerifiedCapability, token: String) -> Self {
        Self {
            connection_id,
            poll_id: capability.poll_id,
            poll_name: capability.poll_name,
            participant_id: capability.identity,
            admin_id: capability.admin_id,
            admin_grant: capability.admin_grant,
            token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin_grant
    }
}

/// コマンド処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 変更が適用され、ルームにブロードキャストされた
    Applied,
    /// セッションが存在しない（終了・期限切れ）。ルームは閉じられた
    SessionEnded,
}

/// ルーム内コマンドのユースケース
pub struct HandlePollCommandUseCase {
    sessions: Arc<PollSessionManager>,
    message_pusher: Arc<dyn MessagePusher>,
    locks: Arc<SessionLocks>,
}

impl HandlePollCommandUseCase {
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

    /// コマンドを実行する
    ///
    /// 成功時は正規の状態をルーム全体にブロードキャストします。
    /// 失敗時は送信元の接続にだけ exception を送り、エラーを返します。
    pub async fn execute(
        &self,
        context: &ConnectionContext,
        command: PollCommand,
    ) -> Result<CommandOutcome, PollError> {
        let command_name = command.name();
        tracing::debug!(
            "Handling '{}' from '{}' in poll '{}'",
            command_name,
            context.participant_id,
            context.poll_id
        );

        let guard = self.locks.lock(&context.poll_id).await;
        let result = self.apply(context, command).await;

        let outcome = match result {
            Ok(outcome) => Ok(outcome),
            // 認可以外で NotFound になるのはセッションが消えた場合のみ
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "Poll '{}' no longer exists while handling '{}'",
                    context.poll_id,
                    command_name
                );
                self.end_room(&context.poll_id).await;
                Ok(CommandOutcome::SessionEnded)
            }
            Err(e) => {
                tracing::warn!(
                    "'{}' from '{}' in poll '{}' failed: {}",
                    command_name,
                    context.participant_id,
                    context.poll_id,
                    e
                );
                room::push_exception(
                    self.message_pusher.as_ref(),
                    &context.poll_id,
                    &context.connection_id,
                    &e,
                )
                .await;
                Err(e)
            }
        };

        drop(guard);
        if outcome == Ok(CommandOutcome::SessionEnded) {
            self.locks.prune(&context.poll_id);
        }
        outcome
    }

    /// 解釈できなかったフレームなど、コマンドになる前のエラーを送信元に返す
    pub async fn reject(&self, context: &ConnectionContext, error: &PollError) {
        room::push_exception(
            self.message_pusher.as_ref(),
            &context.poll_id,
            &context.connection_id,
            error,
        )
        .await;
    }

    async fn apply(
        &self,
        context: &ConnectionContext,
        command: PollCommand,
    ) -> Result<CommandOutcome, PollError> {
        if command.requires_admin() {
            self.authorize_admin(context).await?;
        }

        let poll_id = &context.poll_id;
        let event = match command {
            PollCommand::RemoveParticipant { participant_id } => {
                let update = self
                    .sessions
                    .remove_participant(&context.participant_id, poll_id, &participant_id)
                    .await?;
                updated(update)
            }
            PollCommand::AddNomination {
                participant_id,
                description,
            } => {
                if participant_id
                    .as_ref()
                    .is_some_and(|id| id != &context.participant_id)
                {
                    return Err(PollError::Unauthorized(
                        "nominations can only be made on your own behalf".to_string(),
                    ));
                }
                let update = self
                    .sessions
                    .add_nomination(poll_id, &context.participant_id, description)
                    .await?;
                updated(update)
            }
            PollCommand::RemoveNomination { nomination_id } => {
                updated(self.sessions.remove_nomination(poll_id, &nomination_id).await?)
            }
            PollCommand::StartPoll => {
                let update = self.sessions.start(poll_id).await?;
                ServerEvent::PollStarted {
                    poll: (&update.poll).into(),
                }
            }
            PollCommand::SubmitRankings { rankings } => {
                let update = self
                    .sessions
                    .submit_rankings(poll_id, &context.participant_id, rankings)
                    .await?;
                updated(update)
            }
            PollCommand::ClosePoll => {
                let update = self.sessions.tally(poll_id).await?;
                ServerEvent::PollClosed {
                    poll: (&update.poll).into(),
                }
            }
            PollCommand::EndPoll => {
                self.sessions.end(poll_id).await?;
                self.end_room(poll_id).await;
                return Ok(CommandOutcome::SessionEnded);
            }
        };

        let delivered = room::broadcast(self.message_pusher.as_ref(), poll_id, &event).await?;
        tracing::debug!(
            "Broadcasted update of poll '{}' to {} connection(s)",
            poll_id,
            delivered
        );
        Ok(CommandOutcome::Applied)
    }

    /// 管理者コマンドの認可
    ///
    /// トークンの署名と期限を毎回検証し、セッションを読み直して作成者と照合します。
    async fn authorize_admin(&self, context: &ConnectionContext) -> Result<(), PollError> {
        let capability = self.sessions.verify_capability(&context.token)?;
        if capability.poll_id != context.poll_id || !capability.is_admin() {
            return Err(PollError::Unauthorized(
                "admin privileges required".to_string(),
            ));
        }

        let poll = self.sessions.get(&context.poll_id).await?;
        if !poll.is_created_by(&capability.identity) {
            return Err(PollError::Unauthorized(
                "admin privileges required".to_string(),
            ));
        }
        Ok(())
    }

    /// poll-ended を送ってルームを閉じる
    async fn end_room(&self, poll_id: &PollId) {
        if let Err(e) =
            room::broadcast(self.message_pusher.as_ref(), poll_id, &ServerEvent::PollEnded).await
        {
            tracing::warn!("Failed to broadcast poll-ended for '{}': {}", poll_id, e);
        }
        let closed = self.message_pusher.close_room(poll_id).await;
        tracing::info!("Closed room '{}' ({} connection(s))", poll_id, closed);
    }
}

fn updated(update: PollUpdate) -> ServerEvent {
    ServerEvent::PollUpdated {
        poll: (&update.poll).into(),
        message: update.message,
    }
}
