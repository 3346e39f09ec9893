//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::{ExceptionKind, PollView};

/// POST /api/polls のリクエストボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_per_participant: Option<u32>,
}

/// POST /api/polls のレスポンス
///
/// 署名（管理者トークン）が返されるのはこの 1 回だけ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePollResponse {
    pub poll: PollView,
    pub signature: String,
}

/// POST /api/polls/{id}/join のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPollResponse {
    pub token: String,
}

/// POST /api/polls/{id}/invite のリクエストボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteParticipantRequest {
    pub participant_id: String,
}

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ExceptionKind,
    pub message: String,
}
