//! Conversion logic between DTOs and domain/usecase types.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{
        NewPoll, NominationDescription, NominationId, ParticipantId, PollSession, Topic,
        ValueObjectError, VotesPerParticipant,
    },
    infrastructure::dto::{
        http::CreatePollRequest,
        websocket::{ClientEvent, ExceptionKind, NominationView, PollView, ResultView, ServerEvent},
    },
    usecase::{ErrorKind, PollCommand, PollError},
};

// ========================================
// DTO → Domain / UseCase
// ========================================

impl TryFrom<ClientEvent> for PollCommand {
    type Error = PollError;

    fn try_from(event: ClientEvent) -> Result<Self, Self::Error> {
        let command = match event {
            ClientEvent::RemoveParticipant { id } => PollCommand::RemoveParticipant {
                participant_id: ParticipantId::new(id)?,
            },
            ClientEvent::AddNomination {
                participant_id,
                description,
            } => PollCommand::AddNomination {
                participant_id: participant_id.map(ParticipantId::new).transpose()?,
                description: NominationDescription::new(description)?,
            },
            ClientEvent::RemoveNomination { nomination_id } => PollCommand::RemoveNomination {
                nomination_id: NominationId::new(nomination_id)?,
            },
            ClientEvent::StartPoll => PollCommand::StartPoll,
            ClientEvent::SubmitRankings { rankings } => PollCommand::SubmitRankings {
                rankings: rankings
                    .into_iter()
                    .map(NominationId::new)
                    .collect::<Result<Vec<_>, _>>()?,
            },
            ClientEvent::ClosePoll => PollCommand::ClosePoll,
            ClientEvent::EndPoll => PollCommand::EndPoll,
        };
        Ok(command)
    }
}

impl TryFrom<CreatePollRequest> for NewPoll {
    type Error = ValueObjectError;

    fn try_from(request: CreatePollRequest) -> Result<Self, Self::Error> {
        let votes_per_participant = match request.votes_per_participant {
            Some(votes) => VotesPerParticipant::new(votes)?,
            None => VotesPerParticipant::default(),
        };
        Ok(Self {
            topic: Topic::new(request.topic)?,
            topic_image_url: request
                .topic_image_url
                .filter(|url| !url.trim().is_empty()),
            votes_per_participant,
        })
    }
}

// ========================================
// Domain / UseCase → DTO
// ========================================

impl From<&PollSession> for PollView {
    fn from(session: &PollSession) -> Self {
        Self {
            id: session.id.to_string(),
            topic: session.topic.to_string(),
            topic_image_url: session.topic_image_url.clone(),
            created_by: session.created_by.to_string(),
            votes_per_participant: session.votes_per_participant.value(),
            participants: session
                .participants
                .iter()
                .map(|(id, name)| (id.to_string(), name.clone()))
                .collect(),
            nominations: session
                .nominations
                .iter()
                .map(|(id, nomination)| {
                    (
                        id.to_string(),
                        NominationView {
                            participant_id: nomination.participant_id.to_string(),
                            description: nomination.description.to_string(),
                        },
                    )
                })
                .collect(),
            rankings: session
                .rankings
                .iter()
                .map(|(id, ranking)| {
                    (
                        id.to_string(),
                        ranking.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            results: session
                .results
                .iter()
                .map(|result| ResultView {
                    nomination_id: result.nomination_id.to_string(),
                    nomination_description: result.nomination_description.clone(),
                    score: result.score,
                })
                .collect(),
            has_started: session.has_started,
            created_at: timestamp_to_rfc3339(session.created_at.value()),
            updated_at: timestamp_to_rfc3339(session.updated_at.value()),
        }
    }
}

impl From<ErrorKind> for ExceptionKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ExceptionKind::NotFound,
            ErrorKind::BadRequest => ExceptionKind::BadRequest,
            ErrorKind::Unauthorized => ExceptionKind::Unauthorized,
            ErrorKind::InternalError => ExceptionKind::InternalError,
        }
    }
}

impl From<&PollError> for ServerEvent {
    fn from(error: &PollError) -> Self {
        ServerEvent::Exception {
            kind: error.kind().into(),
            message: error.message().to_string(),
        }
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PollIdFactory, Timestamp};

    #[test]
    fn test_poll_view_omits_signature() {
        // テスト項目: ルームに公開する表現には署名が含まれず、時刻は RFC 3339 になる
        // given (前提条件):
        let session = PollSession::new(
            PollIdFactory::generate(),
            NewPoll {
                topic: Topic::new("Lunch".to_string()).unwrap(),
                topic_image_url: None,
                votes_per_participant: VotesPerParticipant::default(),
            },
            ParticipantId::new("admin".to_string()).unwrap(),
            "secret-signature".to_string(),
            Timestamp::new(0),
        );

        // when (操作):
        let json = serde_json::to_value(PollView::from(&session)).unwrap();

        // then (期待する結果):
        assert!(json.get("signature").is_none());
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00+00:00");
        assert_eq!(json["votesPerParticipant"], 1);
        assert!(!json.to_string().contains("secret-signature"));
    }

    #[test]
    fn test_client_event_to_command() {
        // テスト項目: クライアントイベントが検証済みのコマンドに変換される
        // given (前提条件):
        let event = ClientEvent::SubmitRankings {
            rankings: vec!["n1".to_string(), "n2".to_string()],
        };
        let invalid = ClientEvent::AddNomination {
            participant_id: None,
            description: "x".repeat(101),
        };

        // when (操作):
        let command = PollCommand::try_from(event).unwrap();
        let error = PollCommand::try_from(invalid).unwrap_err();

        // then (期待する結果):
        assert_eq!(
            command,
            PollCommand::SubmitRankings {
                rankings: vec![
                    NominationId::new("n1".to_string()).unwrap(),
                    NominationId::new("n2".to_string()).unwrap(),
                ]
            }
        );
        assert_eq!(error.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_create_request_defaults() {
        // テスト項目: 省略された枠数は 1、空の画像 URL は None になる
        // given (前提条件):
        let request = CreatePollRequest {
            topic: "Lunch".to_string(),
            topic_image_url: Some("  ".to_string()),
            votes_per_participant: None,
        };

        // when (操作):
        let poll = NewPoll::try_from(request).unwrap();

        // then (期待する結果):
        assert_eq!(poll.votes_per_participant.value(), 1);
        assert_eq!(poll.topic_image_url, None);
    }

    #[test]
    fn test_exception_event_from_error() {
        // テスト項目: エラーが送信元向けの exception イベントになる
        let event = ServerEvent::from(&PollError::Unauthorized("admin only".to_string()));

        assert_eq!(
            event,
            ServerEvent::Exception {
                kind: ExceptionKind::Unauthorized,
                message: "admin only".to_string(),
            }
        );
    }
}
