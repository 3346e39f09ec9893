//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ルーム（ポーリング ID）ごとに接続中の `UnboundedSender` を管理
//! - ルーム内の特定接続への送信（push_to）とルーム全体への送信（broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 送信はチャンネルに積むだけなので、ロックを保持したままでも待ちは発生しません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PollId, PusherChannel};

type Room = HashMap<ConnectionId, PusherChannel>;

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.join_room(&poll_id, connection_id, sender).await;
/// pusher.broadcast(&poll_id, "{\"type\":\"poll-ended\"}").await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: ポーリング ID, Value: 接続 ID → 送信チャンネル
    rooms: Mutex<HashMap<PollId, Room>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn join_room(&self, room: &PollId, connection: ConnectionId, sender: PusherChannel) {
        let mut rooms = self.rooms.lock().await;
        let members = rooms.entry(room.clone()).or_default();
        tracing::debug!(
            "Connection '{}' joined room '{}' ({} member(s))",
            connection,
            room,
            members.len() + 1
        );
        members.insert(connection, sender);
    }

    async fn leave_room(&self, room: &PollId, connection: &ConnectionId) -> usize {
        let mut rooms = self.rooms.lock().await;
        let Some(members) = rooms.get_mut(room) else {
            return 0;
        };
        members.remove(connection);
        let remaining = members.len();
        if remaining == 0 {
            rooms.remove(room);
        }
        tracing::debug!(
            "Connection '{}' left room '{}' ({} member(s) remaining)",
            connection,
            room,
            remaining
        );
        remaining
    }

    async fn push_to(
        &self,
        room: &PollId,
        connection: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let rooms = self.rooms.lock().await;

        let sender = rooms
            .get(room)
            .and_then(|members| members.get(connection))
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection.to_string()))?;

        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", connection);

        Ok(())
    }

    async fn broadcast(&self, room: &PollId, content: &str) -> Result<usize, MessagePushError> {
        let rooms = self.rooms.lock().await;
        let Some(members) = rooms.get(room) else {
            tracing::debug!("Room '{}' has no members, skipping broadcast", room);
            return Ok(0);
        };

        let mut delivered = 0;
        for (connection, sender) in members {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = sender.send(content.to_string()) {
                tracing::warn!(
                    "Failed to push message to connection '{}': {}",
                    connection,
                    e
                );
            } else {
                delivered += 1;
            }
        }
        tracing::debug!(
            "Broadcasted message to {}/{} connection(s) in room '{}'",
            delivered,
            members.len(),
            room
        );

        Ok(delivered)
    }

    async fn close_room(&self, room: &PollId) -> usize {
        let mut rooms = self.rooms.lock().await;
        // sender を破棄すると各接続の送信ループが終了する
        let closed = rooms.remove(room).map(|members| members.len()).unwrap_or(0);
        tracing::debug!("Closed room '{}' ({} connection(s))", room, closed);
        closed
    }

    async fn room_size(&self, room: &PollId) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.get(room).map(HashMap::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionIdFactory, PollIdFactory};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルームへの参加・退出と、ルーム単位の送信
    // - push_to: 発信元の接続のみへの送信
    // - broadcast: ルーム内全員への送信（他のルームには届かない）
    // - close_room: 送信チャンネルの破棄
    //
    // 【なぜこのテストが必要か】
    // - ルームはブロードキャストの単位であり、他のポーリングに状態が漏れてはならない
    // - 例外イベントは発信元にだけ届く必要がある
    // ========================================

    #[tokio::test]
    async fn test_broadcast_reaches_only_room_members() {
        // テスト項目: ブロードキャストは同じルームの接続にのみ届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let poll_a = PollIdFactory::generate();
        let poll_b = PollIdFactory::generate();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        pusher.join_room(&poll_a, ConnectionIdFactory::generate(), tx1).await;
        pusher.join_room(&poll_a, ConnectionIdFactory::generate(), tx2).await;
        pusher.join_room(&poll_b, ConnectionIdFactory::generate(), tx3).await;

        // when (操作):
        let delivered = pusher.broadcast(&poll_a, "update").await;

        // then (期待する結果):
        assert_eq!(delivered, Ok(2));
        assert_eq!(rx1.recv().await, Some("update".to_string()));
        assert_eq!(rx2.recv().await, Some("update".to_string()));
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_to_single_connection() {
        // テスト項目: push_to は指定した接続にのみ送信する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let poll = PollIdFactory::generate();
        let alice = ConnectionIdFactory::generate();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.join_room(&poll, alice.clone(), tx1).await;
        pusher.join_room(&poll, ConnectionIdFactory::generate(), tx2).await;

        // when (操作):
        let result = pusher.push_to(&poll, &alice, "exception").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some("exception".to_string()));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_push_to_unknown_connection_fails() {
        // テスト項目: 存在しない接続への送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let poll = PollIdFactory::generate();

        // when (操作):
        let result = pusher
            .push_to(&poll, &ConnectionIdFactory::generate(), "hello")
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ConnectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_closed_receiver() {
        // テスト項目: 受信側が閉じた接続があってもブロードキャストは成功する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let poll = PollIdFactory::generate();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        pusher.join_room(&poll, ConnectionIdFactory::generate(), tx1).await;
        pusher.join_room(&poll, ConnectionIdFactory::generate(), tx2).await;
        drop(rx2);

        // when (操作):
        let delivered = pusher.broadcast(&poll, "update").await;

        // then (期待する結果): ブロードキャストは部分失敗を許容
        assert_eq!(delivered, Ok(1));
        assert_eq!(rx1.recv().await, Some("update".to_string()));
    }

    #[tokio::test]
    async fn test_leave_and_close_room() {
        // テスト項目: 退出で残り人数が返り、ルームを閉じると送信チャンネルが破棄される
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let poll = PollIdFactory::generate();
        let alice = ConnectionIdFactory::generate();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.join_room(&poll, alice.clone(), tx1).await;
        pusher.join_room(&poll, ConnectionIdFactory::generate(), tx2).await;

        // when (操作):
        let remaining = pusher.leave_room(&poll, &alice).await;
        let closed = pusher.close_room(&poll).await;

        // then (期待する結果):
        assert_eq!(remaining, 1);
        assert_eq!(closed, 1);
        assert_eq!(pusher.room_size(&poll).await, 0);
        assert_eq!(rx2.recv().await, None);
    }
}
