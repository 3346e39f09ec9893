//! UseCase: ポーリングセッションの管理
//!
//! セッションドキュメントの作成・読み出し・部分更新・削除を担当し、
//! セッションストアを呼び出す唯一の窓口です。
//!
//! ストアのエラーは操作ごとに `PollError` に変換します。
//! キーが存在しない（未作成・期限切れ・削除済み）場合はどの操作でも `NotFound` です
//! （ランキング提出のみ `BadRequest`）。
//!
//! 各操作はドキュメントを変更した後にストアから読み直した正規の状態を返します。
//! 読み出し → 判断 → 書き込みの原子性は呼び出し側（`SessionLocks`）が保証します。

use std::sync::Arc;

use serde_json::{Value, json};

use crate::domain::{
    CapabilityGrant, CapabilityTokenService, NewPoll, Nomination, NominationDescription,
    NominationId, NominationIdFactory, ParticipantDirectory, ParticipantId, PollArchive, PollId,
    PollIdFactory, PollSession, SessionStore, StoreError, StorePath, Timestamp,
    VerifiedCapability, session_key, tally,
};
use hiroba_shared::time::Clock;

use super::{config::PollsConfig, error::PollError};

/// 変更後の正規のセッションと、ルームに伝えるメッセージ
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub poll: PollSession,
    pub message: Option<String>,
}

impl PollUpdate {
    fn new(poll: PollSession, message: impl Into<Option<String>>) -> Self {
        Self {
            poll,
            message: message.into(),
        }
    }
}

/// ポーリングセッション管理のユースケース
pub struct PollSessionManager {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn ParticipantDirectory>,
    archive: Arc<dyn PollArchive>,
    tokens: Arc<dyn CapabilityTokenService>,
    clock: Arc<dyn Clock>,
    config: PollsConfig,
}

impl PollSessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn ParticipantDirectory>,
        archive: Arc<dyn PollArchive>,
        tokens: Arc<dyn CapabilityTokenService>,
        clock: Arc<dyn Clock>,
        config: PollsConfig,
    ) -> Self {
        Self {
            store,
            directory,
            archive,
            tokens,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PollsConfig {
        &self.config
    }

    /// ポーリングを作成する
    ///
    /// 管理者トークンを発行してドキュメントに保存し、TTL 付きで書き込みます。
    /// アーカイブへの保存に失敗した場合は書き込んだドキュメントも削除します。
    pub async fn create(
        &self,
        admin_id: ParticipantId,
        poll: NewPoll,
    ) -> Result<PollSession, PollError> {
        let poll_id = PollIdFactory::generate();
        let key = session_key(&poll_id);

        let signature = self.tokens.sign(CapabilityGrant::admin(
            admin_id.clone(),
            poll_id.clone(),
            poll.topic.as_str(),
        ))?;

        let session = PollSession::new(poll_id.clone(), poll, admin_id, signature, self.now());
        let document = session.to_document()?;

        if let Err(e) = self
            .store
            .create_with_ttl(&key, document, self.config.duration())
            .await
        {
            tracing::error!("Failed to save poll '{}' to the session store: {}", poll_id, e);
            self.discard(&key).await;
            return Err(PollError::Internal(format!("failed to create poll: {}", e)));
        }

        if let Err(e) = self.archive.save(&session).await {
            tracing::error!("Failed to archive poll '{}': {}", poll_id, e);
            self.discard(&key).await;
            return Err(PollError::Internal(format!("failed to create poll: {}", e)));
        }

        tracing::info!(
            "Created poll '{}' ({}) with TTL of {} seconds",
            poll_id,
            session.topic,
            self.config.duration().as_secs()
        );

        self.read(&poll_id).await
    }

    /// セッションを読み出す
    pub async fn get(&self, poll_id: &PollId) -> Result<PollSession, PollError> {
        self.read(poll_id).await
    }

    /// 参加者を追加する
    pub async fn add_participant(
        &self,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<PollUpdate, PollError> {
        let participant = self
            .directory
            .resolve(participant_id)
            .await
            .map_err(|e| PollError::Internal(e.to_string()))?
            .ok_or_else(|| {
                PollError::NotFound(format!("participant '{}' not found", participant_id))
            })?;

        self.write(
            poll_id,
            &StorePath::participant(participant_id),
            json!(participant.display_name),
            PollError::BadRequest,
        )
        .await?;

        let poll = self.read(poll_id).await?;
        tracing::debug!(
            "Participants of poll '{}': {:?}",
            poll_id,
            poll.participants.keys().collect::<Vec<_>>()
        );

        Ok(PollUpdate::new(
            poll,
            format!("@{} joined your poll", participant.display_name),
        ))
    }

    /// 管理者による参加者の除外
    ///
    /// 開始後の除外は `BadRequest`。管理者でなければ `Unauthorized` で、ドキュメントは変更しません。
    pub async fn remove_participant(
        &self,
        admin_id: &ParticipantId,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<PollUpdate, PollError> {
        let poll = self.read(poll_id).await?;

        if !poll.is_created_by(admin_id) {
            return Err(PollError::Unauthorized(
                "only the poll admin can remove participants".to_string(),
            ));
        }
        if poll.has_started {
            return Err(PollError::BadRequest(
                "participants cannot be removed after the poll has started".to_string(),
            ));
        }

        self.leave(poll_id, participant_id).await
    }

    /// 参加者の退出（どのフェーズでも可能、存在しない参加者でもエラーにしない）
    pub async fn leave(
        &self,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<PollUpdate, PollError> {
        let display_name = self.display_name(poll_id, participant_id).await;

        let removed = self
            .remove(
                poll_id,
                &StorePath::participant(participant_id),
                PollError::BadRequest,
            )
            .await?;

        let poll = self.read(poll_id).await?;
        if removed {
            tracing::debug!(
                "Participants of poll '{}': {:?}",
                poll_id,
                poll.participants.keys().collect::<Vec<_>>()
            );
        }

        Ok(PollUpdate::new(
            poll,
            format!("@{} left the poll", display_name),
        ))
    }

    /// ノミネーションを追加する
    pub async fn add_nomination(
        &self,
        poll_id: &PollId,
        participant_id: &ParticipantId,
        description: NominationDescription,
    ) -> Result<PollUpdate, PollError> {
        let nomination_id = NominationIdFactory::generate();
        let nomination = Nomination {
            participant_id: participant_id.clone(),
            description,
        };
        let value = serde_json::to_value(&nomination)
            .map_err(|e| PollError::Internal(e.to_string()))?;

        self.write(
            poll_id,
            &StorePath::nomination(&nomination_id),
            value,
            PollError::Internal,
        )
        .await?;

        let display_name = self.display_name(poll_id, participant_id).await;
        let poll = self.read(poll_id).await?;

        Ok(PollUpdate::new(
            poll,
            format!("@{} just nominated!", display_name),
        ))
    }

    /// ノミネーションを取り下げる
    pub async fn remove_nomination(
        &self,
        poll_id: &PollId,
        nomination_id: &NominationId,
    ) -> Result<PollUpdate, PollError> {
        let removed = self
            .remove(
                poll_id,
                &StorePath::nomination(nomination_id),
                PollError::Internal,
            )
            .await?;
        if !removed {
            tracing::debug!(
                "Nomination '{}' was not present in poll '{}'",
                nomination_id,
                poll_id
            );
        }

        Ok(PollUpdate::new(self.read(poll_id).await?, None::<String>))
    }

    /// ポーリングを開始する（2 回目以降は `BadRequest`）
    pub async fn start(&self, poll_id: &PollId) -> Result<PollUpdate, PollError> {
        let poll = self.read(poll_id).await?;
        if poll.has_started {
            return Err(PollError::BadRequest(
                "poll has already been started".to_string(),
            ));
        }

        self.write(
            poll_id,
            &StorePath::has_started(),
            json!(true),
            PollError::Internal,
        )
        .await?;

        tracing::info!("Poll '{}' has been started", poll_id);

        Ok(PollUpdate::new(
            self.read(poll_id).await?,
            "The poll has been started by the admin".to_string(),
        ))
    }

    /// ランキングを提出する（同じ参加者の以前の提出は置き換える）
    pub async fn submit_rankings(
        &self,
        poll_id: &PollId,
        participant_id: &ParticipantId,
        rankings: Vec<NominationId>,
    ) -> Result<PollUpdate, PollError> {
        let poll = self.read(poll_id).await.map_err(|e| match e {
            PollError::NotFound(_) => PollError::BadRequest(
                "rankings cannot be submitted before the poll is created".to_string(),
            ),
            other => other,
        })?;
        poll.validate_rankings(&rankings)?;

        let value = json!(rankings.iter().map(NominationId::as_str).collect::<Vec<_>>());
        self.write(
            poll_id,
            &StorePath::ranking(participant_id),
            value,
            PollError::Internal,
        )
        .await
        .map_err(|e| match e {
            PollError::NotFound(_) => PollError::BadRequest(
                "rankings cannot be submitted after the poll has ended".to_string(),
            ),
            other => other,
        })?;

        let display_name = poll
            .display_name_of(participant_id)
            .unwrap_or(participant_id.as_str())
            .to_string();

        Ok(PollUpdate::new(
            self.read(poll_id).await?,
            format!("@{} just ranked a nomination", display_name),
        ))
    }

    /// 集計して結果を書き込む
    pub async fn tally(&self, poll_id: &PollId) -> Result<PollUpdate, PollError> {
        let poll = self.read(poll_id).await?;
        if poll.rankings.is_empty() {
            return Err(PollError::BadRequest(
                "cannot tally a poll without any rankings".to_string(),
            ));
        }

        let results = tally(&poll.rankings, &poll.nominations, poll.votes_per_participant);
        tracing::info!(
            "Tallied poll '{}': {} ranking(s), {} result(s)",
            poll_id,
            poll.rankings.len(),
            results.len()
        );

        let value = serde_json::to_value(&results).map_err(|e| PollError::Internal(e.to_string()))?;
        self.write(poll_id, &StorePath::results(), value, PollError::BadRequest)
            .await?;

        let poll = self.read(poll_id).await?;
        let message = format!("Results for poll: \"{}\" have been updated", poll.topic);

        Ok(PollUpdate::new(poll, message))
    }

    /// セッションを削除する（既に存在しなくてもエラーにしない）
    pub async fn end(&self, poll_id: &PollId) -> Result<(), PollError> {
        let deleted = self
            .store
            .delete_document(&session_key(poll_id))
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete poll '{}': {}", poll_id, e);
                PollError::Internal(format!("failed to end poll: {}", e))
            })?;

        tracing::info!("Ended poll '{}' (document present: {})", poll_id, deleted);
        Ok(())
    }

    /// 参加トークンを発行する
    ///
    /// ポーリングが存在し、参加者がディレクトリで解決できる場合のみ発行します。
    pub async fn issue_join_token(
        &self,
        poll_id: &PollId,
        participant_id: &ParticipantId,
    ) -> Result<String, PollError> {
        let poll = self.read(poll_id).await?;
        // 管理者本人は作成時の管理者トークンで接続する
        if poll.is_created_by(participant_id) {
            return Err(PollError::Unauthorized(
                "join tokens are not issued to the poll admin".to_string(),
            ));
        }

        let known = self
            .directory
            .resolve(participant_id)
            .await
            .map_err(|e| PollError::Internal(e.to_string()))?
            .is_some();
        if !known {
            return Err(PollError::NotFound(format!(
                "participant '{}' not found",
                participant_id
            )));
        }

        let token = self.tokens.sign(CapabilityGrant::participant(
            poll.created_by,
            poll.id,
            poll.topic.into_string(),
            participant_id.clone(),
        ))?;

        tracing::debug!(
            "Issued join token for '{}' on poll '{}'",
            participant_id,
            poll_id
        );
        Ok(token)
    }

    /// ケーパビリティトークンを検証する
    pub fn verify_capability(&self, token: &str) -> Result<VerifiedCapability, PollError> {
        self.tokens.verify(token).map_err(PollError::from)
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    async fn read(&self, poll_id: &PollId) -> Result<PollSession, PollError> {
        let document = self
            .store
            .get(&session_key(poll_id))
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch poll '{}': {}", poll_id, e);
                PollError::Internal(format!("failed to fetch poll: {}", e))
            })?
            .ok_or_else(|| not_found(poll_id))?;

        PollSession::from_document(document).map_err(|e| {
            tracing::error!("Stored document for poll '{}' is invalid: {}", poll_id, e);
            PollError::from(e)
        })
    }

    /// パスに値を書き込み、`updatedAt` を更新する
    async fn write(
        &self,
        poll_id: &PollId,
        path: &StorePath,
        value: Value,
        on_failure: fn(String) -> PollError,
    ) -> Result<(), PollError> {
        let key = session_key(poll_id);
        self.store
            .set_path(&key, path, value)
            .await
            .map_err(|e| store_failure(poll_id, path, e, on_failure))?;
        self.touch(poll_id, on_failure).await
    }

    /// パスを削除し、削除した場合のみ `updatedAt` を更新する
    async fn remove(
        &self,
        poll_id: &PollId,
        path: &StorePath,
        on_failure: fn(String) -> PollError,
    ) -> Result<bool, PollError> {
        let removed = self
            .store
            .delete_path(&session_key(poll_id), path)
            .await
            .map_err(|e| store_failure(poll_id, path, e, on_failure))?;
        if removed {
            self.touch(poll_id, on_failure).await?;
        }
        Ok(removed)
    }

    async fn touch(
        &self,
        poll_id: &PollId,
        on_failure: fn(String) -> PollError,
    ) -> Result<(), PollError> {
        let path = StorePath::updated_at();
        self.store
            .set_path(&session_key(poll_id), &path, json!(self.now()))
            .await
            .map_err(|e| store_failure(poll_id, &path, e, on_failure))
    }

    /// 表示名を解決する（セッション → ディレクトリ → ID の順）
    async fn display_name(&self, poll_id: &PollId, participant_id: &ParticipantId) -> String {
        if let Ok(poll) = self.read(poll_id).await {
            if let Some(name) = poll.display_name_of(participant_id) {
                return name.to_string();
            }
        }

        match self.directory.resolve(participant_id).await {
            Ok(Some(participant)) => participant.display_name,
            _ => participant_id.as_str().to_string(),
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.store.delete_document(key).await {
            tracing::warn!("Failed to discard partially created poll '{}': {}", key, e);
        }
    }
}

fn not_found(poll_id: &PollId) -> PollError {
    PollError::NotFound(format!("poll '{}' not found", poll_id))
}

fn store_failure(
    poll_id: &PollId,
    path: &StorePath,
    error: StoreError,
    on_failure: fn(String) -> PollError,
) -> PollError {
    match error {
        StoreError::KeyNotFound(_) => not_found(poll_id),
        other => {
            tracing::error!("Failed to update '{}' of poll '{}': {}", path, poll_id, other);
            on_failure(format!("failed to update poll: {}", other))
        }
    }
}
