//! ポーリングごとの排他制御
//!
//! 同じポーリングに対する「読み出し → 判断 → 書き込み → 再読み出し → ブロードキャスト」を
//! 1 つの単位として直列化します。異なるポーリング同士は並行に処理されます。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::PollId;

#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<PollId, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// ポーリングのロックを取得する（取得できるまで待つ）
    pub async fn lock(&self, poll_id: &PollId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(poll_id.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// 誰も保持・待機していないロックを破棄する
    ///
    /// ガードを解放した後に呼び出すこと。使用中なら何もしない。
    pub fn prune(&self, poll_id: &PollId) -> bool {
        self.locks
            .remove_if(poll_id, |_, mutex| Arc::strong_count(mutex) == 1)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
