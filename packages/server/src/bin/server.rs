//! Live poll server.
//!
//! Run with:
//! ```not_rust
//! POLL_SIGNING_SECRET=change-me cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 \
//!     --signing-secret change-me --participants-file participants.json
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use hiroba_server::{
    infrastructure::{
        capability::JwtCapabilityTokenService,
        directory::{InMemoryParticipantDirectory, InMemoryPollArchive},
        message_pusher::WebSocketMessagePusher,
        store::InMemorySessionStore,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, HandlePollCommandUseCase,
        InviteParticipantUseCase, PollSessionManager, PollsConfig, SessionLocks,
    },
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Live poll server with ranked-choice tallies over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Poll duration in seconds (session TTL and token lifetime)
    #[arg(long, env = "POLL_DURATION", default_value = "30000")]
    poll_duration: u64,

    /// Secret used to sign capability tokens
    #[arg(long, env = "POLL_SIGNING_SECRET", hide_env_values = true)]
    signing_secret: String,

    /// JSON file with the participant directory (`[{"id", "displayName"}]`)
    #[arg(long, env = "PARTICIPANTS_FILE")]
    participants_file: Option<String>,

    /// Resolve ids missing from the directory to themselves
    #[arg(long, env = "ALLOW_UNKNOWN_PARTICIPANTS")]
    allow_unknown_participants: bool,

    /// Interval in seconds between sweeps of expired sessions
    #[arg(long, env = "SWEEP_INTERVAL", default_value = "30")]
    sweep_interval: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Initialize dependencies in order:
    // 1. Config
    // 2. Store, directory, archive, token service
    // 3. MessagePusher
    // 4. UseCases
    // 5. Server

    // 1. Validate configuration
    let config = match PollsConfig::new(
        Duration::from_secs(args.poll_duration),
        args.signing_secret,
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    tracing::info!("Starting with {:?}", config);

    // 2. Create collaborators
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemorySessionStore::new(clock.clone()));
    let _sweeper = store
        .clone()
        .spawn_sweeper(Duration::from_secs(args.sweep_interval.max(1)));

    let directory = match &args.participants_file {
        Some(path) => match InMemoryParticipantDirectory::from_json_file(path).await {
            Ok(directory) => {
                tracing::info!("Loaded {} participant(s) from {}", directory.len(), path);
                directory
            }
            Err(e) => {
                tracing::error!("Failed to load participant directory: {}", e);
                std::process::exit(2);
            }
        },
        None => InMemoryParticipantDirectory::default(),
    }
    .allow_unknown(args.allow_unknown_participants);
    if directory.is_empty() && !args.allow_unknown_participants {
        tracing::warn!(
            "Participant directory is empty and unknown participants are rejected; nobody can join"
        );
    }

    let tokens = Arc::new(JwtCapabilityTokenService::new(
        config.signing_secret(),
        config.duration(),
    ));
    let sessions = Arc::new(PollSessionManager::new(
        store,
        Arc::new(directory),
        Arc::new(InMemoryPollArchive::new()),
        tokens,
        clock,
        config,
    ));

    // 3. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let locks = Arc::new(SessionLocks::new());

    // 4. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        sessions.clone(),
        message_pusher.clone(),
        locks.clone(),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        sessions.clone(),
        message_pusher.clone(),
        locks.clone(),
    ));
    let handle_poll_command_usecase = Arc::new(HandlePollCommandUseCase::new(
        sessions.clone(),
        message_pusher.clone(),
        locks.clone(),
    ));
    let invite_participant_usecase = Arc::new(InviteParticipantUseCase::new(
        sessions.clone(),
        message_pusher,
        locks,
    ));

    // 5. Create and run the server
    let server = Server::new(
        sessions,
        connect_participant_usecase,
        disconnect_participant_usecase,
        handle_poll_command_usecase,
        invite_participant_usecase,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
