//! MessagePusher trait 定義
//!
//! ルーム（ポーリング ID ごとの接続の集合）へのメッセージ送信を抽象化します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    value_object::{ConnectionId, PollId},
};

/// 接続ごとの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// MessagePusher trait
///
/// 同じルームへのブロードキャストは呼び出し順に各接続のチャンネルへ積まれます。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続をルームに参加させる
    async fn join_room(&self, room: &PollId, connection: ConnectionId, sender: PusherChannel);

    /// 接続をルームから外し、残りの接続数を返す
    async fn leave_room(&self, room: &PollId, connection: &ConnectionId) -> usize;

    /// ルーム内の特定の接続にのみ送信
    async fn push_to(
        &self,
        room: &PollId,
        connection: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// ルーム内の全接続に送信し、配信できた接続数を返す
    async fn broadcast(&self, room: &PollId, content: &str) -> Result<usize, MessagePushError>;

    /// ルームを閉じて全接続の送信チャンネルを破棄し、閉じた接続数を返す
    async fn close_room(&self, room: &PollId) -> usize;

    /// ルーム内の接続数
    async fn room_size(&self, room: &PollId) -> usize;
}
