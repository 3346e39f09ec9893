//! エンティティ定義
//!
//! `PollSession` は 1 つのアクティブなポーリングの状態全体を表すドキュメントです。
//! セッションストアには JSON として保存され、読み出すたびに
//! [`PollSession::from_document`] で型付けと検証を行います。

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::DomainError,
    value_object::{
        NominationDescription, NominationId, ParticipantId, PollId, Timestamp, Topic,
        VotesPerParticipant,
    },
};

/// 現在のドキュメントスキーマバージョン
pub const SCHEMA_VERSION: u32 = 1;

/// ユーザーディレクトリが解決した参加者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// 参加者が提案した候補
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub participant_id: ParticipantId,
    pub description: NominationDescription,
}

/// 集計結果の 1 行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub nomination_id: NominationId,
    pub nomination_description: String,
    pub score: f64,
}

/// ポーリング作成リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    pub topic: Topic,
    pub topic_image_url: Option<String>,
    pub votes_per_participant: VotesPerParticipant,
}

/// アクティブなポーリングのセッションドキュメント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSession {
    pub schema_version: u32,
    pub id: PollId,
    pub topic: Topic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_image_url: Option<String>,
    pub created_by: ParticipantId,
    pub votes_per_participant: VotesPerParticipant,
    /// 参加者 ID → 表示名
    #[serde(default)]
    pub participants: BTreeMap<ParticipantId, String>,
    #[serde(default)]
    pub nominations: BTreeMap<NominationId, Nomination>,
    /// 参加者 ID → 優先順のノミネーション ID
    #[serde(default)]
    pub rankings: BTreeMap<ParticipantId, Vec<NominationId>>,
    /// 集計前は空
    #[serde(default)]
    pub results: Vec<PollResult>,
    #[serde(default)]
    pub has_started: bool,
    pub signature: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PollSession {
    pub fn new(
        id: PollId,
        poll: NewPoll,
        created_by: ParticipantId,
        signature: String,
        now: Timestamp,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id,
            topic: poll.topic,
            topic_image_url: poll.topic_image_url,
            created_by,
            votes_per_participant: poll.votes_per_participant,
            participants: BTreeMap::new(),
            nominations: BTreeMap::new(),
            rankings: BTreeMap::new(),
            results: Vec::new(),
            has_started: false,
            signature,
            created_at: now,
            updated_at: now,
        }
    }

    /// ストアから読み出した JSON を型付きのセッションに変換して検証する
    pub fn from_document(document: Value) -> Result<Self, DomainError> {
        let session: Self = serde_json::from_value(document)
            .map_err(|e| DomainError::InvalidDocument(e.to_string()))?;
        session.validate()?;
        Ok(session)
    }

    /// ストアに書き込む JSON に変換する
    pub fn to_document(&self) -> Result<Value, DomainError> {
        serde_json::to_value(self).map_err(|e| DomainError::InvalidDocument(e.to_string()))
    }

    /// 型だけでは表現できない不変条件を検証する
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(DomainError::UnsupportedSchemaVersion(self.schema_version));
        }
        if self.updated_at < self.created_at {
            return Err(DomainError::InvalidDocument(
                "updatedAt precedes createdAt".to_string(),
            ));
        }
        if self.signature.is_empty() {
            return Err(DomainError::InvalidDocument(
                "signature is missing".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_created_by(&self, participant_id: &ParticipantId) -> bool {
        &self.created_by == participant_id
    }

    pub fn display_name_of(&self, participant_id: &ParticipantId) -> Option<&str> {
        self.participants.get(participant_id).map(String::as_str)
    }

    /// 提出されたランキングを検証する
    ///
    /// 空のリスト、枠数超過、重複、存在しないノミネーションを拒否します。
    pub fn validate_rankings(&self, rankings: &[NominationId]) -> Result<(), DomainError> {
        if rankings.is_empty() {
            return Err(DomainError::InvalidRankings(
                "at least one nomination must be ranked".to_string(),
            ));
        }

        let slots = self.votes_per_participant.value() as usize;
        if rankings.len() > slots {
            return Err(DomainError::InvalidRankings(format!(
                "at most {} nominations may be ranked (got {})",
                slots,
                rankings.len()
            )));
        }

        let mut seen = HashSet::new();
        for nomination_id in rankings {
            if !seen.insert(nomination_id) {
                return Err(DomainError::InvalidRankings(format!(
                    "nomination '{}' is ranked more than once",
                    nomination_id
                )));
            }
            if !self.nominations.contains_key(nomination_id) {
                return Err(DomainError::InvalidRankings(format!(
                    "nomination '{}' does not exist",
                    nomination_id
                )));
            }
        }

        Ok(())
    }
}
