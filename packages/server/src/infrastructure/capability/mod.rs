//! ケーパビリティトークンの実装
//!
//! - `jwt`: HS256 署名の JWT

pub mod jwt;

pub use jwt::JwtCapabilityTokenService;
