//! ルームへの送信ヘルパー
//!
//! ユースケースが組み立てたイベントを JSON にしてルームへ送ります。

use crate::{
    domain::{ConnectionId, MessagePusher, PollId},
    infrastructure::dto::websocket::ServerEvent,
};

use super::error::PollError;

/// ルーム全体へ送信し、配信できた接続数を返す
pub(crate) async fn broadcast(
    message_pusher: &dyn MessagePusher,
    poll_id: &PollId,
    event: &ServerEvent,
) -> Result<usize, PollError> {
    let json = event
        .to_json()
        .map_err(|e| PollError::Internal(format!("failed to encode event: {}", e)))?;
    message_pusher
        .broadcast(poll_id, &json)
        .await
        .map_err(|e| PollError::Internal(e.to_string()))
}

/// 送信元の接続にだけ exception を返す（失敗してもログのみ）
pub(crate) async fn push_exception(
    message_pusher: &dyn MessagePusher,
    poll_id: &PollId,
    connection_id: &ConnectionId,
    error: &PollError,
) {
    let event = ServerEvent::from(error);
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode exception event: {}", e);
            return;
        }
    };
    if let Err(e) = message_pusher.push_to(poll_id, connection_id, &json).await {
        tracing::debug!(
            "Could not deliver exception to connection '{}': {}",
            connection_id,
            e
        );
    }
}
