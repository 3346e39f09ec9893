//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, HandlePollCommandUseCase,
    InviteParticipantUseCase, PollSessionManager,
};

use super::{
    handler::{
        create_poll, get_poll, health_check, invite_participant, join_poll, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Live poll server
///
/// This struct encapsulates the server dependencies and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     sessions,
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     handle_poll_command_usecase,
///     invite_participant_usecase,
/// );
/// server.run("127.0.0.1".to_string(), 8000).await?;
/// ```
pub struct Server {
    /// PollSessionManager（セッション操作）
    sessions: Arc<PollSessionManager>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// HandlePollCommandUseCase（ルーム内コマンドのユースケース）
    handle_poll_command_usecase: Arc<HandlePollCommandUseCase>,
    /// InviteParticipantUseCase（管理者による招待のユースケース）
    invite_participant_usecase: Arc<InviteParticipantUseCase>,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        sessions: Arc<PollSessionManager>,
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        handle_poll_command_usecase: Arc<HandlePollCommandUseCase>,
        invite_participant_usecase: Arc<InviteParticipantUseCase>,
    ) -> Self {
        Self {
            sessions,
            connect_participant_usecase,
            disconnect_participant_usecase,
            handle_poll_command_usecase,
            invite_participant_usecase,
        }
    }

    /// Build the router with all endpoints
    pub fn router(self) -> Router {
        let app_state = Arc::new(AppState {
            sessions: self.sessions,
            connect_participant_usecase: self.connect_participant_usecase,
            disconnect_participant_usecase: self.disconnect_participant_usecase,
            handle_poll_command_usecase: self.handle_poll_command_usecase,
            invite_participant_usecase: self.invite_participant_usecase,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws/polls", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/polls", post(create_poll))
            .route("/api/polls/{poll_id}", get(get_poll))
            .route("/api/polls/{poll_id}/join", post(join_poll))
            .route("/api/polls/{poll_id}/invite", post(invite_participant))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the poll server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8000)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Poll server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws/polls", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
