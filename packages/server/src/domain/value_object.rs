//! 値オブジェクト定義
//!
//! セッションドキュメントに現れる識別子と長さ制約付き文字列。
//! 生成時とデシリアライズ時の両方で検証されるため、ストアから読み出した
//! ドキュメントも型のレベルで制約を満たしていることが保証されます。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// 識別子として許容する最大文字数
pub const MAX_ID_LENGTH: usize = 64;
/// トピックの最大文字数
pub const MAX_TOPIC_LENGTH: usize = 500;
/// ノミネーション説明文の最大文字数
pub const MAX_DESCRIPTION_LENGTH: usize = 100;

fn validate_length(field: &'static str, value: &str, max: usize) -> Result<(), ValueObjectError> {
    let length = value.chars().count();
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty { field });
    }
    if length > max {
        return Err(ValueObjectError::TooLong {
            field,
            max,
            actual: length,
        });
    }
    Ok(())
}

/// 文字列ベースの値オブジェクトに共通の実装をまとめて生成する
macro_rules! string_value_object {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// ポーリング（セッション）ID
///
/// UUID v4 の文字列表現。作成後は不変です。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PollId(String);

impl PollId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        Uuid::parse_str(&value).map_err(|_| ValueObjectError::InvalidPollId(value.clone()))?;
        Ok(Self(value))
    }

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

string_value_object!(PollId);

/// 参加者 ID（ユーザー ID）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_length("participant id", &value, MAX_ID_LENGTH)?;
        Ok(Self(value))
    }
}

string_value_object!(ParticipantId);

/// ノミネーション ID（ランダム生成）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NominationId(String);

impl NominationId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_length("nomination id", &value, MAX_ID_LENGTH)?;
        Ok(Self(value))
    }
}

impl NominationId {
    pub(crate) fn from_random(value: String) -> Self {
        Self(value)
    }
}

string_value_object!(NominationId);

/// WebSocket 接続ごとの ID
///
/// 同じ参加者が複数のタブから接続できるため、参加者 ID とは別に管理します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_length("connection id", &value, MAX_ID_LENGTH)?;
        Ok(Self(value))
    }
}

impl ConnectionId {
    pub(crate) fn from_random(value: String) -> Self {
        Self(value)
    }
}

string_value_object!(ConnectionId);

/// ポーリングのトピック（1〜500 文字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_length("topic", &value, MAX_TOPIC_LENGTH)?;
        Ok(Self(value))
    }
}

string_value_object!(Topic);

/// ノミネーションの説明文（1〜100 文字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NominationDescription(String);

impl NominationDescription {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_length("nomination description", &value, MAX_DESCRIPTION_LENGTH)?;
        Ok(Self(value))
    }
}

string_value_object!(NominationDescription);

/// 参加者 1 人あたりのランキング枠数（1 以上）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VotesPerParticipant(u32);

impl VotesPerParticipant {
    pub fn new(value: u32) -> Result<Self, ValueObjectError> {
        if value == 0 {
            return Err(ValueObjectError::InvalidVotesPerParticipant(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for VotesPerParticipant {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for VotesPerParticipant {
    type Error = ValueObjectError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VotesPerParticipant> for u32 {
    fn from(value: VotesPerParticipant) -> Self {
        value.0
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_rejects_blank_and_too_long() {
        // テスト項目: 空白のみ・長すぎる参加者 ID は拒否される
        // given (前提条件):
        let blank = "   ".to_string();
        let too_long = "x".repeat(MAX_ID_LENGTH + 1);

        // when (操作):
        let blank_result = ParticipantId::new(blank);
        let too_long_result = ParticipantId::new(too_long);

        // then (期待する結果):
        assert_eq!(
            blank_result,
            Err(ValueObjectError::Empty {
                field: "participant id"
            })
        );
        assert!(matches!(
            too_long_result,
            Err(ValueObjectError::TooLong { max: MAX_ID_LENGTH, .. })
        ));
    }

    #[test]
    fn test_topic_length_counts_characters_not_bytes() {
        // テスト項目: トピックの長さはバイト数ではなく文字数で判定される
        // given (前提条件): 500 文字のマルチバイト文字列
        let topic = "投".repeat(MAX_TOPIC_LENGTH);

        // when (操作):
        let result = Topic::new(topic.clone());

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), topic);
    }

    #[test]
    fn test_nomination_description_bounds() {
        // テスト項目: 説明文は 1〜100 文字のみ許可される
        // given (前提条件):
        let ok = "a".repeat(MAX_DESCRIPTION_LENGTH);
        let too_long = "a".repeat(MAX_DESCRIPTION_LENGTH + 1);

        // when (操作) / then (期待する結果):
        assert!(NominationDescription::new(ok).is_ok());
        assert!(NominationDescription::new(too_long).is_err());
        assert!(NominationDescription::new(String::new()).is_err());
    }

    #[test]
    fn test_poll_id_requires_uuid() {
        // テスト項目: ポーリング ID は UUID 形式でなければならない
        // given (前提条件):
        let valid = Uuid::new_v4().to_string();

        // when (操作) / then (期待する結果):
        assert!(PollId::new(valid).is_ok());
        assert_eq!(
            PollId::new("not-a-uuid".to_string()),
            Err(ValueObjectError::InvalidPollId("not-a-uuid".to_string()))
        );
    }

    #[test]
    fn test_votes_per_participant_must_be_positive() {
        // テスト項目: ランキング枠数は 1 以上、デフォルトは 1
        // given (前提条件) / when (操作) / then (期待する結果):
        assert_eq!(
            VotesPerParticipant::new(0),
            Err(ValueObjectError::InvalidVotesPerParticipant(0))
        );
        assert_eq!(VotesPerParticipant::new(3).unwrap().value(), 3);
        assert_eq!(VotesPerParticipant::default().value(), 1);
    }

    #[test]
    fn test_deserialization_validates_value_objects() {
        // テスト項目: デシリアライズ時にも値オブジェクトの検証が行われる
        // given (前提条件):
        let invalid = serde_json::json!("");
        let valid = serde_json::json!("alice");

        // when (操作):
        let invalid_result = serde_json::from_value::<ParticipantId>(invalid);
        let valid_result = serde_json::from_value::<ParticipantId>(valid);

        // then (期待する結果):
        assert!(invalid_result.is_err());
        assert_eq!(valid_result.unwrap().as_str(), "alice");
    }
}
