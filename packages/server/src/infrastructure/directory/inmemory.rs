use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::domain::{
    DirectoryError, Participant, ParticipantDirectory, ParticipantId, PollArchive, PollSession,
};

/// シードファイルの 1 エントリ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantSeed {
    id: String,
    display_name: String,
}

/// インメモリの参加者ディレクトリ
///
/// `allow_unknown` が有効な場合、登録されていない ID は ID 自身を表示名として解決します。
#[derive(Debug, Default)]
pub struct InMemoryParticipantDirectory {
    participants: HashMap<ParticipantId, String>,
    allow_unknown: bool,
}

impl InMemoryParticipantDirectory {
    pub fn new(participants: impl IntoIterator<Item = Participant>) -> Self {
        Self {
            participants: participants
                .into_iter()
                .map(|p| (p.id, p.display_name))
                .collect(),
            allow_unknown: false,
        }
    }

    /// `[{"id": "...", "displayName": "..."}]` 形式の JSON から作成
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let seeds: Vec<ParticipantSeed> =
            serde_json::from_str(json).map_err(|e| DirectoryError::InvalidSeed(e.to_string()))?;

        let participants = seeds
            .into_iter()
            .map(|seed| {
                let id = ParticipantId::new(seed.id)
                    .map_err(|e| DirectoryError::InvalidSeed(e.to_string()))?;
                if seed.display_name.trim().is_empty() {
                    return Err(DirectoryError::InvalidSeed(format!(
                        "participant '{}' has an empty display name",
                        id
                    )));
                }
                Ok(Participant::new(id, seed.display_name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(participants))
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DirectoryError::InvalidSeed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// 未登録の ID をそのまま参加者として扱うかを設定
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn resolve(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<Participant>, DirectoryError> {
        let resolved = match self.participants.get(participant_id) {
            Some(display_name) => Some(Participant::new(participant_id.clone(), display_name)),
            None if self.allow_unknown => Some(Participant::new(
                participant_id.clone(),
                participant_id.as_str(),
            )),
            None => None,
        };
        Ok(resolved)
    }
}

/// インメモリのポーリングアーカイブ
#[derive(Debug, Default)]
pub struct InMemoryPollArchive {
    sessions: Mutex<Vec<PollSession>>,
}

impl InMemoryPollArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存されたポーリングの一覧（保存順）
    pub async fn saved(&self) -> Vec<PollSession> {
        self.sessions.lock().await.clone()
    }
}

#[async_trait]
impl PollArchive for InMemoryPollArchive {
    async fn save(&self, session: &PollSession) -> Result<(), DirectoryError> {
        tracing::debug!("Archiving poll '{}' ({})", session.id, session.topic);
        self.sessions.lock().await.push(session.clone());
        Ok(())
    }
}
