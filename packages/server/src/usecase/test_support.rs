//! ユースケースのテスト用ヘルパー

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{
    domain::{NewPoll, Participant, ParticipantId, PollId, Topic, VotesPerParticipant},
    infrastructure::{
        capability::JwtCapabilityTokenService,
        directory::{InMemoryParticipantDirectory, InMemoryPollArchive},
        dto::websocket::ServerEvent,
        message_pusher::WebSocketMessagePusher,
        store::InMemorySessionStore,
    },
};
use hiroba_shared::time::ManualClock;

use super::{
    ConnectParticipantUseCase, ConnectionContext, DisconnectParticipantUseCase,
    HandlePollCommandUseCase, PollSessionManager, PollsConfig, SessionLocks,
};

pub(crate) fn id(value: &str) -> ParticipantId {
    ParticipantId::new(value.to_string()).unwrap()
}

/// 管理者が作成したポーリングと、それを操作するユースケース一式
pub(crate) struct TestRoom {
    pub sessions: Arc<PollSessionManager>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub locks: Arc<SessionLocks>,
    pub clock: Arc<ManualClock>,
    pub connect_usecase: ConnectParticipantUseCase,
    pub disconnect_usecase: DisconnectParticipantUseCase,
    pub commands: HandlePollCommandUseCase,
    pub poll_id: PollId,
    pub admin_token: String,
}

impl TestRoom {
    pub const DURATION_SECS: u64 = 60;

    /// admin が votesPerParticipant = 2 のポーリングを作成した状態
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let directory = InMemoryParticipantDirectory::new([
            Participant::new(id("admin"), "Admin"),
            Participant::new(id("alice"), "Alice"),
            Participant::new(id("bob"), "Bob"),
        ]);
        let duration = Duration::from_secs(Self::DURATION_SECS);
        let sessions = Arc::new(PollSessionManager::new(
            Arc::new(InMemorySessionStore::new(clock.clone())),
            Arc::new(directory),
            Arc::new(InMemoryPollArchive::new()),
            Arc::new(JwtCapabilityTokenService::new("test-secret", duration)),
            clock.clone(),
            PollsConfig::new(duration, "test-secret").unwrap(),
        ));
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let locks = Arc::new(SessionLocks::new());

        let poll = sessions
            .create(
                id("admin"),
                NewPoll {
                    topic: Topic::new("Where should we eat?".to_string()).unwrap(),
                    topic_image_url: None,
                    votes_per_participant: VotesPerParticipant::new(2).unwrap(),
                },
            )
            .await
            .unwrap();

        Self {
            connect_usecase: ConnectParticipantUseCase::new(
                sessions.clone(),
                pusher.clone(),
                locks.clone(),
            ),
            disconnect_usecase: DisconnectParticipantUseCase::new(
                sessions.clone(),
                pusher.clone(),
                locks.clone(),
            ),
            commands: HandlePollCommandUseCase::new(
                sessions.clone(),
                pusher.clone(),
                locks.clone(),
            ),
            sessions,
            pusher,
            locks,
            clock,
            poll_id: poll.id,
            admin_token: poll.signature,
        }
    }

    pub async fn connect_admin(&self) -> TestConnection {
        self.connect_with_token(self.admin_token.clone()).await
    }

    pub async fn connect(&self, participant: &str) -> TestConnection {
        let token = self
            .sessions
            .issue_join_token(&self.poll_id, &id(participant))
            .await
            .unwrap();
        self.connect_with_token(token).await
    }

    pub async fn connect_with_token(&self, token: String) -> TestConnection {
        let (tx, receiver) = mpsc::unbounded_channel();
        let context = self
            .connect_usecase
            .execute(&token, None, tx)
            .await
            .unwrap();
        TestConnection { context, receiver }
    }
}

/// 接続と、その接続に届いたイベント
pub(crate) struct TestConnection {
    pub context: ConnectionContext,
    receiver: mpsc::UnboundedReceiver<String>,
}

impl TestConnection {
    /// 届いているイベントをすべて捨てる
    pub fn drain(&mut self) {
        while self.try_event().is_some() {}
    }

    pub fn try_event(&mut self) -> Option<ServerEvent> {
        self.receiver
            .try_recv()
            .ok()
            .map(|json| serde_json::from_str(&json).unwrap())
    }

    /// 届いているイベントのうち最後のもの
    pub fn last_event(&mut self) -> ServerEvent {
        let mut last = None;
        while let Some(event) = self.try_event() {
            last = Some(event);
        }
        last.expect("no event was delivered")
    }

    /// ルームが閉じられ、送信チャンネルが破棄されたか
    pub fn is_closed(&mut self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }
}
