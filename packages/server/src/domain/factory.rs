//! ID の生成

use uuid::Uuid;

use super::value_object::{ConnectionId, NominationId, PollId};

/// PollId の生成（UUID v4）
pub struct PollIdFactory;

impl PollIdFactory {
    pub fn generate() -> PollId {
        PollId::from_uuid(Uuid::new_v4())
    }
}

/// NominationId の生成（ハイフンなしのランダム文字列）
pub struct NominationIdFactory;

impl NominationIdFactory {
    pub fn generate() -> NominationId {
        NominationId::from_random(Uuid::new_v4().simple().to_string())
    }
}

/// ConnectionId の生成
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    pub fn generate() -> ConnectionId {
        ConnectionId::from_random(Uuid::new_v4().to_string())
    }
}
