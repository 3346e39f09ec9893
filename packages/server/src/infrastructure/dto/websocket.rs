//! WebSocket room events.
//!
//! Frames are JSON objects tagged by `type`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// クライアント → サーバーのイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// 参加者の除外（管理者のみ）
    RemoveParticipant { id: String },
    /// ノミネーションの追加
    ///
    /// `participantId` を省略した場合は接続者自身として扱う
    AddNomination {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_id: Option<String>,
        description: String,
    },
    /// ノミネーションの取り下げ（管理者のみ）
    RemoveNomination { nomination_id: String },
    /// ポーリング開始（管理者のみ）
    StartPoll,
    /// ランキングの提出
    SubmitRankings { rankings: Vec<String> },
    /// 集計してクローズ（管理者のみ）
    ClosePoll,
    /// ポーリング終了・削除（管理者のみ）
    EndPoll,
}

/// サーバー → クライアントのイベント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    PollUpdated {
        poll: PollView,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    PollStarted {
        poll: PollView,
    },
    PollClosed {
        poll: PollView,
    },
    /// セッションが削除された（クライアントは切断する）
    PollEnded,
    /// 送信元の接続にだけ届くエラー
    Exception {
        kind: ExceptionKind,
        message: String,
    },
}

/// エラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    NotFound,
    BadRequest,
    Unauthorized,
    InternalError,
}

/// ルームに公開されるセッションの表現（署名は含まない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_image_url: Option<String>,
    pub created_by: String,
    pub votes_per_participant: u32,
    pub participants: BTreeMap<String, String>,
    pub nominations: BTreeMap<String, NominationView>,
    pub rankings: BTreeMap<String, Vec<String>>,
    pub results: Vec<ResultView>,
    pub has_started: bool,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NominationView {
    pub participant_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub nomination_id: String,
    pub nomination_description: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_format() {
        // テスト項目: クライアントイベントが type タグと camelCase のフィールドで解釈される
        // given (前提条件):
        let frames = [
            r#"{"type":"remove-participant","id":"bob"}"#,
            r#"{"type":"add-nomination","description":"Pizza"}"#,
            r#"{"type":"add-nomination","participantId":"alice","description":"Sushi"}"#,
            r#"{"type":"remove-nomination","nominationId":"n1"}"#,
            r#"{"type":"start-poll"}"#,
            r#"{"type":"submit-rankings","rankings":["n1","n2"]}"#,
            r#"{"type":"close-poll"}"#,
            r#"{"type":"end-poll"}"#,
        ];

        // when (操作):
        let events: Vec<ClientEvent> = frames
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                ClientEvent::RemoveParticipant {
                    id: "bob".to_string()
                },
                ClientEvent::AddNomination {
                    participant_id: None,
                    description: "Pizza".to_string()
                },
                ClientEvent::AddNomination {
                    participant_id: Some("alice".to_string()),
                    description: "Sushi".to_string()
                },
                ClientEvent::RemoveNomination {
                    nomination_id: "n1".to_string()
                },
                ClientEvent::StartPoll,
                ClientEvent::SubmitRankings {
                    rankings: vec!["n1".to_string(), "n2".to_string()]
                },
                ClientEvent::ClosePoll,
                ClientEvent::EndPoll,
            ]
        );
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        // テスト項目: 未知の type や欠けたフィールドは解釈エラーになる
        // given (前提条件):
        let unknown = r#"{"type":"chat","content":"hi"}"#;
        let missing_field = r#"{"type":"remove-participant"}"#;

        // when (操作):
        let unknown_result = serde_json::from_str::<ClientEvent>(unknown);
        let missing_result = serde_json::from_str::<ClientEvent>(missing_field);

        // then (期待する結果):
        assert!(unknown_result.is_err());
        assert!(missing_result.is_err());
    }

    #[test]
    fn test_server_event_wire_format() {
        // テスト項目: サーバーイベントのワイヤ形式
        // given (前提条件):
        let ended = ServerEvent::PollEnded;
        let exception = ServerEvent::Exception {
            kind: ExceptionKind::Unauthorized,
            message: "admin privileges required".to_string(),
        };

        // when (操作):
        let ended_json = serde_json::to_value(&ended).unwrap();
        let exception_json = serde_json::to_value(&exception).unwrap();

        // then (期待する結果):
        assert_eq!(ended_json, serde_json::json!({"type": "poll-ended"}));
        assert_eq!(
            exception_json,
            serde_json::json!({
                "type": "exception",
                "kind": "Unauthorized",
                "message": "admin privileges required"
            })
        );
    }
}
