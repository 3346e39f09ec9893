//! JWT を使った CapabilityTokenService 実装
//!
//! HS256 で署名し、有効期限（`exp`）と主体（`sub`）を必須クレームとして扱います。
//! 期限の猶予（leeway）は 0 秒です。

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use crate::domain::{
    CapabilityClaims, CapabilityError, CapabilityGrant, CapabilityTokenService,
    VerifiedCapability,
};

/// JWT を使った CapabilityTokenService 実装
pub struct JwtCapabilityTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// 発行するトークンの有効期間（ポーリングの継続時間と同じ）
    lifetime: Duration,
}

impl JwtCapabilityTokenService {
    /// 新しい JwtCapabilityTokenService を作成
    pub fn new(signing_secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    fn encode_claims(&self, claims: &CapabilityClaims) -> Result<String, CapabilityError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CapabilityError::Signing(e.to_string()))
    }
}

impl CapabilityTokenService for JwtCapabilityTokenService {
    fn sign(&self, grant: CapabilityGrant) -> Result<String, CapabilityError> {
        let issued_at = Utc::now().timestamp();
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let claims = grant.into_claims(issued_at, issued_at.saturating_add(lifetime));
        self.encode_claims(&claims)
    }

    fn verify(&self, token: &str) -> Result<VerifiedCapability, CapabilityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CapabilityError::Missing);
        }

        let data = decode::<CapabilityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CapabilityError::Expired,
                ErrorKind::InvalidSignature => CapabilityError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                    CapabilityError::InvalidClaim("sub")
                }
                ErrorKind::MissingRequiredClaim(claim) if claim == "exp" => {
                    CapabilityError::InvalidClaim("exp")
                }
                _ => CapabilityError::Malformed(e.to_string()),
            })?;

        VerifiedCapability::try_from(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParticipantId, PollIdFactory};

    const SECRET: &str = "test-signing-secret";

    fn create_test_service() -> JwtCapabilityTokenService {
        JwtCapabilityTokenService::new(SECRET, Duration::from_secs(3600))
    }

    fn admin() -> ParticipantId {
        ParticipantId::new("admin".to_string()).unwrap()
    }

    #[test]
    fn test_sign_and_verify_admin_token() {
        // テスト項目: 発行した管理者トークンを検証でき、接続者は管理者になる
        // given (前提条件):
        let service = create_test_service();
        let poll_id = PollIdFactory::generate();
        let grant = CapabilityGrant::admin(admin(), poll_id.clone(), "Lunch");

        // when (操作):
        let token = service.sign(grant).unwrap();
        let verified = service.verify(&token).unwrap();

        // then (期待する結果):
        assert_eq!(verified.poll_id, poll_id);
        assert_eq!(verified.poll_name, "Lunch");
        assert_eq!(verified.identity, admin());
        assert!(verified.is_admin());
        assert!(verified.expires_at_secs > Utc::now().timestamp());
    }

    #[test]
    fn test_participant_token_embeds_identity() {
        // テスト項目: 参加トークンには接続者の ID が埋め込まれる
        // given (前提条件):
        let service = create_test_service();
        let alice = ParticipantId::new("alice".to_string()).unwrap();
        let grant =
            CapabilityGrant::participant(admin(), PollIdFactory::generate(), "Lunch", alice.clone());

        // when (操作):
        let verified = service.verify(&service.sign(grant).unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(verified.identity, alice);
        assert!(!verified.is_admin());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        // テスト項目: 別の秘密鍵で署名されたトークンは拒否される
        // given (前提条件):
        let other = JwtCapabilityTokenService::new("another-secret", Duration::from_secs(3600));
        let token = other
            .sign(CapabilityGrant::admin(admin(), PollIdFactory::generate(), "Lunch"))
            .unwrap();

        // when (操作):
        let result = create_test_service().verify(&token);

        // then (期待する結果):
        assert_eq!(result, Err(CapabilityError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // テスト項目: 有効期限切れのトークンは拒否される
        // given (前提条件):
        let service = create_test_service();
        let now = Utc::now().timestamp();
        let claims = CapabilityGrant::admin(admin(), PollIdFactory::generate(), "Lunch")
            .into_claims(now - 120, now - 60);
        let token = service.encode_claims(&claims).unwrap();

        // when (操作):
        let result = service.verify(&token);

        // then (期待する結果):
        assert_eq!(result, Err(CapabilityError::Expired));
    }

    #[test]
    fn test_token_without_poll_id_is_rejected() {
        // テスト項目: pollId が空のトークンは構造チェックで拒否される
        // given (前提条件):
        let service = create_test_service();
        let mut claims = CapabilityGrant::admin(admin(), PollIdFactory::generate(), "Lunch")
            .into_claims(Utc::now().timestamp(), Utc::now().timestamp() + 60);
        claims.poll_id = String::new();
        let token = service.encode_claims(&claims).unwrap();

        // when (操作):
        let result = service.verify(&token);

        // then (期待する結果):
        assert_eq!(result, Err(CapabilityError::InvalidClaim("pollId")));
    }

    #[test]
    fn test_missing_and_garbage_tokens_are_rejected() {
        // テスト項目: 空・不正な形式のトークンは拒否される
        // given (前提条件):
        let service = create_test_service();

        // when (操作):
        let missing = service.verify("  ");
        let garbage = service.verify("not.a.jwt");

        // then (期待する結果):
        assert_eq!(missing, Err(CapabilityError::Missing));
        assert!(matches!(garbage, Err(CapabilityError::Malformed(_))));
    }
}
