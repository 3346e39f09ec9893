//! ドメイン層
//!
//! セッションドキュメント、値オブジェクト、集計ロジック、そして
//! 外部（ストア・送信・認可・ディレクトリ）とのインターフェースを定義します。

pub mod capability;
pub mod directory;
pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod repository;
pub mod tally;
pub mod value_object;

pub use capability::{
    CapabilityClaims, CapabilityGrant, CapabilityTokenService, VerifiedCapability,
};
pub use directory::{ParticipantDirectory, PollArchive};
pub use entity::{NewPoll, Nomination, Participant, PollResult, PollSession, SCHEMA_VERSION};
pub use error::{
    CapabilityError, DirectoryError, DomainError, MessagePushError, StoreError, ValueObjectError,
};
pub use factory::{ConnectionIdFactory, NominationIdFactory, PollIdFactory};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{SessionStore, StorePath, session_key};
pub use tally::tally;

pub use value_object::{
    ConnectionId, NominationDescription, NominationId, ParticipantId, PollId, Timestamp, Topic,
    VotesPerParticipant,
};

#[cfg(test)]
pub use capability::MockCapabilityTokenService;
#[cfg(test)]
pub use directory::{MockParticipantDirectory, MockPollArchive};
#[cfg(test)]
pub use repository::MockSessionStore;
