//! ドメイン層のエラー型定義

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("'{0}' is not a valid poll id")]
    InvalidPollId(String),

    #[error("votes per participant must be at least 1 (got {0})")]
    InvalidVotesPerParticipant(u32),
}

/// セッションドキュメントに関するドメインエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 対応していないスキーマバージョンのドキュメント
    #[error("unsupported session schema version {0}")]
    UnsupportedSchemaVersion(u32),

    /// ドキュメントの形式が不正
    #[error("invalid session document: {0}")]
    InvalidDocument(String),

    /// 提出されたランキングが不正
    #[error("invalid rankings: {0}")]
    InvalidRankings(String),
}

/// セッションストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// キーが存在しない（未作成または期限切れ）
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// パスの親が存在しない、またはオブジェクトではない
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// バックエンドが利用できない
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// メッセージ送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found in room")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// ケーパビリティトークンのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// トークンが提示されていない
    #[error("no capability token provided")]
    Missing,

    /// 署名が一致しない
    #[error("capability token signature is invalid")]
    InvalidSignature,

    /// 有効期限切れ
    #[error("capability token has expired")]
    Expired,

    /// 必須クレームが欠けている、または不正
    #[error("capability token claim '{0}' is missing or invalid")]
    InvalidClaim(&'static str),

    /// トークンとして解釈できない
    #[error("malformed capability token: {0}")]
    Malformed(String),

    /// 署名処理の失敗
    #[error("failed to sign capability token: {0}")]
    Signing(String),
}

/// 外部コラボレーター（ユーザーディレクトリ、永続アーカイブ）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("invalid directory seed: {0}")]
    InvalidSeed(String),
}
