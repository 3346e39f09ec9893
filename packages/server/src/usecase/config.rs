//! ポーリングの設定

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("poll duration must be greater than zero")]
    ZeroDuration,

    #[error("poll signing secret must not be empty")]
    EmptySigningSecret,
}

/// 検証済みのポーリング設定
#[derive(Clone, PartialEq, Eq)]
pub struct PollsConfig {
    /// セッションの TTL とトークンの有効期間
    duration: Duration,
    signing_secret: String,
}

impl PollsConfig {
    pub fn new(duration: Duration, signing_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let signing_secret = signing_secret.into();
        if duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if signing_secret.trim().is_empty() {
            return Err(ConfigError::EmptySigningSecret);
        }
        Ok(Self {
            duration,
            signing_secret,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn signing_secret(&self) -> &str {
        &self.signing_secret
    }
}

// 秘密鍵をログに出さない
impl std::fmt::Debug for PollsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollsConfig")
            .field("duration", &self.duration)
            .field("signing_secret", &"<redacted>")
            .finish()
    }
}
