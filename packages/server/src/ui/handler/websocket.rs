//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::ParticipantId,
    infrastructure::dto::websocket::ClientEvent,
    ui::state::AppState,
    usecase::{ConnectionContext, PollCommand, PollError},
};

use super::{USER_ID_HEADER, header_credential, status_code};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// ハンドシェイクのケーパビリティトークン
///
/// `Authorization: Bearer`、`X-Poll-Signature`、`?token=` の順に探す
fn credential<'a>(headers: &'a HeaderMap, query: &'a ConnectQuery) -> Option<&'a str> {
    header_credential(headers).or_else(|| {
        query
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(token) = credential(&headers, &query) else {
        tracing::warn!("WebSocket handshake without a capability token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    // X-User-Id は任意。指定された場合はトークン内の ID と一致する必要がある
    let claimed_identity = match headers
        .get(USER_ID_HEADER)
        .map(|value| value.to_str().map(str::to_string))
    {
        None => None,
        Some(Ok(value)) => match ParticipantId::try_from(value) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Invalid X-User-Id header: {}", e);
                return Err(StatusCode::BAD_REQUEST);
            }
        },
        Some(Err(_)) => return Err(StatusCode::BAD_REQUEST),
    };

    // Create a channel for this connection to receive room events
    let (tx, rx) = mpsc::unbounded_channel();

    // ConnectParticipantUseCase がルームへの参加とブロードキャストまで行う
    let context = match state
        .connect_participant_usecase
        .execute(token, claimed_identity, tx)
        .await
    {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!("Refusing WebSocket connection: {}", e);
            return Err(status_code(e.kind()));
        }
    };

    let failed_state = state.clone();
    let failed_context = context.clone();
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!(
                "WebSocket upgrade failed for connection '{}': {}",
                failed_context.connection_id,
                e
            );
            tokio::spawn(async move {
                if let Err(e) = failed_state
                    .disconnect_participant_usecase
                    .execute(&failed_context)
                    .await
                {
                    tracing::warn!(
                        "Failed to remove '{}' from poll '{}' after a failed upgrade: {}",
                        failed_context.participant_id,
                        failed_context.poll_id,
                        e
                    );
                }
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, context, rx)))
}

/// Spawns a task that receives room events from the rx channel and pushes them to the WebSocket sender.
///
/// The loop ends when the room is closed (all senders dropped); the socket is then closed too.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    context: ConnectionContext,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let recv_state = state.clone();
    let recv_context = context.clone();

    // Spawn a task to receive events from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&recv_state, &recv_context, text.as_str()).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!(
                        "Connection '{}' requested close",
                        recv_context.connection_id
                    );
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward room events to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state
        .disconnect_participant_usecase
        .execute(&context)
        .await
    {
        tracing::warn!(
            "Failed to remove '{}' from poll '{}': {}",
            context.participant_id,
            context.poll_id,
            e
        );
    }
}

/// テキストフレームをコマンドとして処理する
///
/// 結果はユースケースがルーム（成功時）または送信元（失敗時）に送る
async fn handle_text(state: &AppState, context: &ConnectionContext, text: &str) {
    tracing::debug!("Received frame from '{}': {}", context.connection_id, text);

    let command = serde_json::from_str::<ClientEvent>(text)
        .map_err(|e| PollError::BadRequest(format!("invalid event: {}", e)))
        .and_then(PollCommand::try_from);

    match command {
        Ok(command) => {
            let _ = state
                .handle_poll_command_usecase
                .execute(context, command)
                .await;
        }
        Err(e) => {
            tracing::warn!(
                "Rejected frame from '{}': {}",
                context.connection_id,
                e
            );
            state.handle_poll_command_usecase.reject(context, &e).await;
        }
    }
}
