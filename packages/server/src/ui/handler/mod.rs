//! Request handlers.

mod http;
mod websocket;

use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};

use crate::usecase::ErrorKind;

pub use http::{create_poll, get_poll, health_check, invite_participant, join_poll};
pub use websocket::websocket_handler;

/// 接続者（管理者・参加者）の ID を示すヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";
/// ケーパビリティトークンを渡すヘッダー
pub const POLL_SIGNATURE_HEADER: &str = "x-poll-signature";

fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// ヘッダーで渡されたケーパビリティトークン（`Authorization: Bearer` を優先）
fn header_credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let signature = headers
        .get(POLL_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    bearer
        .or(signature)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
