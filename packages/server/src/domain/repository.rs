//! SessionStore trait 定義
//!
//! ドメイン層が必要とするセッションストアのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ストアはキーごとの JSON ドキュメントを保持し、パス単位の更新・削除を
//! それぞれアトミックに行います。複数の呼び出しをまたぐ一貫性は保証しません。

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use super::{
    error::StoreError,
    value_object::{NominationId, ParticipantId, PollId},
};

/// セッションドキュメントのキー（`polls:{pollId}`）
pub fn session_key(poll_id: &PollId) -> String {
    format!("polls:{}", poll_id.as_str())
}

/// ドキュメント内のフィールドを指すパス
///
/// オブジェクトのフィールド名のみで構成され、配列の添字は扱いません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn participant(participant_id: &ParticipantId) -> Self {
        Self::new(["participants", participant_id.as_str()])
    }

    pub fn nomination(nomination_id: &NominationId) -> Self {
        Self::new(["nominations", nomination_id.as_str()])
    }

    pub fn ranking(participant_id: &ParticipantId) -> Self {
        Self::new(["rankings", participant_id.as_str()])
    }

    pub fn has_started() -> Self {
        Self::new(["hasStarted"])
    }

    pub fn results() -> Self {
        Self::new(["results"])
    }

    pub fn updated_at() -> Self {
        Self::new(["updatedAt"])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for segment in &self.0 {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Session Store trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// ドキュメント全体を取得（存在しない・期限切れの場合は `None`）
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// パスに値を設定
    async fn set_path(&self, key: &str, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// パスの値を削除（存在しなかった場合は `Ok(false)`）
    async fn delete_path(&self, key: &str, path: &StorePath) -> Result<bool, StoreError>;

    /// 有効期限付きでドキュメントを作成（既存のものは置き換える）
    async fn create_with_ttl(
        &self,
        key: &str,
        document: Value,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// ドキュメント全体を削除（存在しなかった場合は `Ok(false)`）
    async fn delete_document(&self, key: &str) -> Result<bool, StoreError>;
}
