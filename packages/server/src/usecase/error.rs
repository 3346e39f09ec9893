//! UseCase 層のエラー型定義

use thiserror::Error;

use crate::domain::{CapabilityError, DomainError, ValueObjectError};

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Unauthorized,
    InternalError,
}

/// ポーリング操作のエラー
///
/// ストアやトークンのエラーはこの型に変換してから外に出します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::NotFound(_) => ErrorKind::NotFound,
            PollError::BadRequest(_) => ErrorKind::BadRequest,
            PollError::Unauthorized(_) => ErrorKind::Unauthorized,
            PollError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PollError::NotFound(message)
            | PollError::BadRequest(message)
            | PollError::Unauthorized(message)
            | PollError::Internal(message) => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<ValueObjectError> for PollError {
    fn from(e: ValueObjectError) -> Self {
        PollError::BadRequest(e.to_string())
    }
}

impl From<CapabilityError> for PollError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Signing(_) => PollError::Internal(e.to_string()),
            _ => PollError::Unauthorized(e.to_string()),
        }
    }
}

impl From<DomainError> for PollError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidRankings(_) => PollError::BadRequest(e.to_string()),
            DomainError::UnsupportedSchemaVersion(_) | DomainError::InvalidDocument(_) => {
                PollError::Internal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        // テスト項目: 下位層のエラーが適切な分類に変換される
        // given (前提条件):
        let expired = PollError::from(CapabilityError::Expired);
        let signing = PollError::from(CapabilityError::Signing("boom".to_string()));
        let rankings = PollError::from(DomainError::InvalidRankings("dup".to_string()));
        let document = PollError::from(DomainError::UnsupportedSchemaVersion(2));
        let empty = PollError::from(ValueObjectError::Empty { field: "topic" });

        // when (操作):
        let kinds = [&expired, &signing, &rankings, &document, &empty].map(PollError::kind);

        // then (期待する結果):
        assert_eq!(
            kinds,
            [
                ErrorKind::Unauthorized,
                ErrorKind::InternalError,
                ErrorKind::BadRequest,
                ErrorKind::InternalError,
                ErrorKind::BadRequest,
            ]
        );
        assert_eq!(empty.message(), "topic must not be empty");
    }
}
