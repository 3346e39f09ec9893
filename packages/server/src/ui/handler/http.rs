//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    domain::{NewPoll, ParticipantId, PollId},
    infrastructure::dto::{
        http::{
            CreatePollRequest, CreatePollResponse, ErrorResponse, InviteParticipantRequest,
            JoinPollResponse,
        },
        websocket::PollView,
    },
    ui::state::AppState,
    usecase::PollError,
};

use super::{POLL_SIGNATURE_HEADER, USER_ID_HEADER, header_credential, status_code};

/// HTTP レスポンスに変換できる PollError
pub struct ApiError(PollError);

impl From<PollError> for ApiError {
    fn from(error: PollError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(self.0.kind());
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }
        let body = ErrorResponse {
            kind: self.0.kind().into(),
            message: self.0.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// `X-User-Id` ヘッダーから呼び出し元の ID を取り出す
fn user_id_from(headers: &HeaderMap) -> Result<ParticipantId, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| PollError::Unauthorized("X-User-Id header is required".to_string()))?;
    ParticipantId::new(value.to_string()).map_err(|e| PollError::from(e).into())
}

fn poll_id_from(raw: String) -> Result<PollId, ApiError> {
    PollId::new(raw).map_err(|e| PollError::NotFound(e.to_string()).into())
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a poll
///
/// 署名（管理者トークン）はレスポンスボディと `X-Poll-Signature` ヘッダーで一度だけ返す
pub async fn create_poll(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admin_id = user_id_from(&headers)?;
    let new_poll = NewPoll::try_from(body).map_err(PollError::from)?;

    let poll = state.sessions.create(admin_id, new_poll).await?;

    // Domain Model から DTO への変換
    let response = CreatePollResponse {
        poll: PollView::from(&poll),
        signature: poll.signature.clone(),
    };
    Ok((
        StatusCode::CREATED,
        [(POLL_SIGNATURE_HEADER, poll.signature)],
        Json(response),
    ))
}

/// Get poll by ID
pub async fn get_poll(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
) -> Result<Json<PollView>, ApiError> {
    let poll_id = poll_id_from(poll_id)?;
    let poll = state.sessions.get(&poll_id).await?;
    Ok(Json(PollView::from(&poll)))
}

/// Issue a join token for the caller
pub async fn join_poll(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JoinPollResponse>, ApiError> {
    let participant_id = user_id_from(&headers)?;
    let poll_id = poll_id_from(poll_id)?;
    let token = state
        .sessions
        .issue_join_token(&poll_id, &participant_id)
        .await?;
    Ok(Json(JoinPollResponse { token }))
}

/// Invite a participant from the directory (admin token required)
pub async fn invite_participant(
    State(state): State<Arc<AppState>>,
    Path(poll_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<InviteParticipantRequest>,
) -> Result<Json<PollView>, ApiError> {
    let token = header_credential(&headers)
        .ok_or_else(|| PollError::Unauthorized("admin token is required".to_string()))?;
    let poll_id = poll_id_from(poll_id)?;
    let participant_id = ParticipantId::new(body.participant_id).map_err(PollError::from)?;

    let poll = state
        .invite_participant_usecase
        .execute(token, &poll_id, &participant_id)
        .await?;
    Ok(Json(PollView::from(&poll)))
}
