//! InMemory Session Store 実装
//!
//! ドメイン層が定義する SessionStore trait の具体的な実装。
//! HashMap をインメモリのドキュメントストアとして使用します。
//!
//! - 各呼び出しは 1 つのロックの中で完結するため、パス単位の更新はアトミック
//! - 有効期限は作成時点から固定（パスの更新では延長されない）
//! - 期限切れのドキュメントはアクセス時に削除され、スイーパーでも定期的に掃除される

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use serde_json::Value;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{SessionStore, StoreError, StorePath};

/// 保存されたドキュメントと有効期限
struct StoredDocument {
    document: Value,
    /// Unix タイムスタンプ（ミリ秒）
    expires_at: i64,
}

impl StoredDocument {
    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// インメモリ Session Store 実装
pub struct InMemorySessionStore {
    documents: Mutex<HashMap<String, StoredDocument>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    /// 新しい InMemorySessionStore を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 期限切れのドキュメントをすべて削除し、削除した件数を返す
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut documents = self.documents.lock().await;
        let before = documents.len();
        documents.retain(|_, stored| !stored.is_expired(now));
        before - documents.len()
    }

    /// 保持しているドキュメント数（期限切れで未削除のものを含む）
    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }

    /// 一定間隔で `purge_expired` を実行するタスクを起動
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    tracing::debug!("Purged {} expired session document(s)", purged);
                }
            }
        })
    }
}

/// 期限切れなら削除し、有効なエントリのみ返す
fn live_entry<'a>(
    documents: &'a mut HashMap<String, StoredDocument>,
    key: &str,
    now: i64,
) -> Option<&'a mut StoredDocument> {
    if documents.get(key).is_some_and(|stored| stored.is_expired(now)) {
        documents.remove(key);
        tracing::debug!("Session document '{}' expired", key);
        return None;
    }
    documents.get_mut(key)
}

fn navigate_mut<'a>(root: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    segments
        .iter()
        .try_fold(root, |current, segment| current.as_object_mut()?.get_mut(segment))
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = self.clock.now_millis();
        let mut documents = self.documents.lock().await;
        Ok(live_entry(&mut documents, key, now).map(|stored| stored.document.clone()))
    }

    async fn set_path(&self, key: &str, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let mut documents = self.documents.lock().await;
        let stored = live_entry(&mut documents, key, now)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        let Some((leaf, parents)) = path.segments().split_last() else {
            stored.document = value;
            return Ok(());
        };

        let parent = navigate_mut(&mut stored.document, parents)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        parent.insert(leaf.clone(), value);

        Ok(())
    }

    async fn delete_path(&self, key: &str, path: &StorePath) -> Result<bool, StoreError> {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };

        let now = self.clock.now_millis();
        let mut documents = self.documents.lock().await;
        let stored = live_entry(&mut documents, key, now)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        // 親が存在しなければ何もしない
        let Some(parent) = navigate_mut(&mut stored.document, parents) else {
            return Ok(false);
        };
        let parent = parent
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        Ok(parent.remove(leaf).is_some())
    }

    async fn create_with_ttl(
        &self,
        key: &str,
        document: Value,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = self.clock.now_millis().saturating_add(ttl_millis);

        let mut documents = self.documents.lock().await;
        documents.insert(
            key.to_string(),
            StoredDocument {
                document,
                expires_at,
            },
        );
        tracing::debug!(
            "Stored session document '{}' with TTL of {} seconds",
            key,
            ttl.as_secs()
        );

        Ok(())
    }

    async fn delete_document(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        let mut documents = self.documents.lock().await;
        let existed = live_entry(&mut documents, key, now).is_some();
        documents.remove(key);
        Ok(existed)
    }
}
