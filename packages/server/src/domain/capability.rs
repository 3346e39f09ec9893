//! ケーパビリティトークン
//!
//! ポーリングに対する唯一の認可情報。署名付き・期限付きで、次の 2 種類があります。
//!
//! - 管理者トークン: ポーリング作成時に発行。`participantId` は空で、
//!   接続者は `sub`（管理者）本人として扱われる
//! - 参加トークン: 参加時に発行。`sub` は管理者、`participantId` が接続者
//!
//! 接続者の ID はトークンに埋め込まれており、ヘッダーなど署名されていない
//! 値だけで本人を名乗ることはできません。

use serde::{Deserialize, Serialize};

use super::{
    error::CapabilityError,
    value_object::{ParticipantId, PollId},
};

/// トークンのクレーム（ワイヤ形式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityClaims {
    /// 管理者 ID
    pub sub: String,
    pub poll_id: String,
    pub poll_name: String,
    /// 管理者トークンでは空文字列
    #[serde(default)]
    pub participant_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// 署名対象の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGrant {
    pub admin_id: ParticipantId,
    pub poll_id: PollId,
    pub poll_name: String,
    /// `None` なら管理者トークン
    pub participant_id: Option<ParticipantId>,
}

impl CapabilityGrant {
    pub fn admin(admin_id: ParticipantId, poll_id: PollId, poll_name: impl Into<String>) -> Self {
        Self {
            admin_id,
            poll_id,
            poll_name: poll_name.into(),
            participant_id: None,
        }
    }

    pub fn participant(
        admin_id: ParticipantId,
        poll_id: PollId,
        poll_name: impl Into<String>,
        participant_id: ParticipantId,
    ) -> Self {
        Self {
            admin_id,
            poll_id,
            poll_name: poll_name.into(),
            participant_id: Some(participant_id),
        }
    }

    /// 有効期間を指定してクレームに変換する
    pub fn into_claims(self, issued_at_secs: i64, expires_at_secs: i64) -> CapabilityClaims {
        CapabilityClaims {
            sub: self.admin_id.into_string(),
            poll_id: self.poll_id.into_string(),
            poll_name: self.poll_name,
            participant_id: self
                .participant_id
                .map(ParticipantId::into_string)
                .unwrap_or_default(),
            iat: issued_at_secs,
            exp: expires_at_secs,
        }
    }
}

/// 署名と期限の検証を通過し、構造も確認済みのケーパビリティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCapability {
    pub admin_id: ParticipantId,
    pub poll_id: PollId,
    pub poll_name: String,
    /// この接続の参加者 ID
    pub identity: ParticipantId,
    /// 作成時に発行された管理者トークンか（`participantId` が空）
    pub admin_grant: bool,
    pub expires_at_secs: i64,
}

impl VerifiedCapability {
    /// 管理者トークンによる接続か
    ///
    /// 参加トークンは participantId が管理者 ID と同じでも管理者にはならない
    pub fn is_admin(&self) -> bool {
        self.admin_grant
    }
}

impl TryFrom<CapabilityClaims> for VerifiedCapability {
    type Error = CapabilityError;

    fn try_from(claims: CapabilityClaims) -> Result<Self, Self::Error> {
        let admin_id =
            ParticipantId::new(claims.sub).map_err(|_| CapabilityError::InvalidClaim("sub"))?;
        let poll_id =
            PollId::new(claims.poll_id).map_err(|_| CapabilityError::InvalidClaim("pollId"))?;
        let admin_grant = claims.participant_id.is_empty();
        let identity = if admin_grant {
            admin_id.clone()
        } else {
            ParticipantId::new(claims.participant_id)
                .map_err(|_| CapabilityError::InvalidClaim("participantId"))?
        };

        Ok(Self {
            admin_id,
            poll_id,
            poll_name: claims.poll_name,
            identity,
            admin_grant,
            expires_at_secs: claims.exp,
        })
    }
}

/// トークンの発行・検証
///
/// 検証は署名・期限・必須クレームのすべてを確認し、どれかが欠けていれば
/// 失敗させます。一部だけ信用することはありません。
#[cfg_attr(test, mockall::automock)]
pub trait CapabilityTokenService: Send + Sync {
    fn sign(&self, grant: CapabilityGrant) -> Result<String, CapabilityError>;

    fn verify(&self, token: &str) -> Result<VerifiedCapability, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL_ID: &str = "6f1c0c8e-2a57-4d8e-9a62-0a4b7d3c1e55";

    fn claims(participant_id: &str) -> CapabilityClaims {
        CapabilityClaims {
            sub: "admin".to_string(),
            poll_id: POLL_ID.to_string(),
            poll_name: "Lunch".to_string(),
            participant_id: participant_id.to_string(),
            iat: 0,
            exp: 100,
        }
    }

    #[test]
    fn test_admin_token_identity_is_subject() {
        // テスト項目: participantId が空のトークンは管理者本人の接続になる
        // given (前提条件):
        let claims = claims("");

        // when (操作):
        let verified = VerifiedCapability::try_from(claims).unwrap();

        // then (期待する結果):
        assert_eq!(verified.identity.as_str(), "admin");
        assert!(verified.is_admin());
    }

    #[test]
    fn test_participant_token_identity_is_embedded_participant() {
        // テスト項目: 参加トークンの接続者は埋め込まれた participantId になる
        // given (前提条件):
        let claims = claims("alice");

        // when (操作):
        let verified = VerifiedCapability::try_from(claims).unwrap();

        // then (期待する結果):
        assert_eq!(verified.identity.as_str(), "alice");
        assert_eq!(verified.admin_id.as_str(), "admin");
        assert!(!verified.is_admin());
    }

    #[test]
    fn test_participant_token_for_admin_id_is_not_admin() {
        // テスト項目: participantId に管理者 ID を入れた参加トークンは管理者にならない
        // given (前提条件):
        let claims = claims("admin");

        // when (操作):
        let verified = VerifiedCapability::try_from(claims).unwrap();

        // then (期待する結果):
        assert_eq!(verified.identity, verified.admin_id);
        assert!(!verified.admin_grant);
        assert!(!verified.is_admin());
    }

    #[test]
    fn test_missing_poll_id_is_rejected() {
        // テスト項目: pollId が欠けたトークンは構造チェックで拒否される
        // given (前提条件):
        let mut claims = claims("alice");
        claims.poll_id = String::new();

        // when (操作):
        let result = VerifiedCapability::try_from(claims);

        // then (期待する結果):
        assert_eq!(result, Err(CapabilityError::InvalidClaim("pollId")));
    }

    #[test]
    fn test_grant_into_claims() {
        // テスト項目: 管理者トークンの participantId は空文字列になる
        // given (前提条件):
        let grant = CapabilityGrant::admin(
            ParticipantId::new("admin".to_string()).unwrap(),
            PollId::new(POLL_ID.to_string()).unwrap(),
            "Lunch",
        );

        // when (操作):
        let claims = grant.into_claims(10, 20);

        // then (期待する結果):
        assert_eq!(claims.participant_id, "");
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.poll_id, POLL_ID);
        assert_eq!((claims.iat, claims.exp), (10, 20));
    }
}
