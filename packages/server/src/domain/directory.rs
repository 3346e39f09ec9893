//! 外部コラボレーターのインターフェース
//!
//! - `ParticipantDirectory`: ユーザー ID から表示名を解決する
//! - `PollArchive`: 作成されたポーリングのメタデータを永続化する（作成時に 1 度だけ呼ばれる）

use async_trait::async_trait;

use super::{
    entity::{Participant, PollSession},
    error::DirectoryError,
    value_object::ParticipantId,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// 参加者を解決する（存在しない場合は `None`）
    async fn resolve(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<Participant>, DirectoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollArchive: Send + Sync {
    /// 作成直後のポーリングを保存する
    async fn save(&self, session: &PollSession) -> Result<(), DirectoryError>;
}
