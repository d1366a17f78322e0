use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use plaudit_core::config::StoreBackend;
use plaudit_core::{Comment, CommentPatch, NewComment};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::log::CommentLog;
use crate::store::{Appended, CommentStore};

/// Volatile backend: the collection lives only in process memory.
///
/// Mutations hold the write guard for the in-memory change only; reads
/// share the read guard for the span of one copy.
#[derive(Debug, Default)]
pub struct MemoryStore {
    log: RwLock<CommentLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CommentLog> {
        self.log.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CommentLog> {
        self.log.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    #[instrument(skip(self, candidate))]
    async fn append(&self, candidate: NewComment) -> Result<Appended> {
        let appended = self.write().append(candidate);
        debug!(id = %appended.comment.id, total = appended.total, "comment appended");
        Ok(appended)
    }

    async fn all(&self) -> Result<Vec<Comment>> {
        Ok(self.read().comments().to_vec())
    }

    async fn get(&self, id: &str) -> Result<Comment> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: CommentPatch) -> Result<Comment> {
        self.write()
            .update(id, &patch)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<Comment> {
        self.write()
            .remove(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        Ok(self.write().clear())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn append_then_get_returns_same_record() {
        let store = MemoryStore::new();
        let appended = store
            .append(NewComment::new("Ali", "Great session"))
            .await
            .unwrap();
        let fetched = store.get(&appended.comment.id).await.unwrap();
        assert_eq!(fetched, appended.comment);
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_later_mutations() {
        let store = MemoryStore::new();
        store.append(NewComment::new("a", "1")).await.unwrap();
        let snapshot = store.all().await.unwrap();
        store.append(NewComment::new("b", "2")).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "a");
    }

    #[tokio::test]
    async fn insertion_order_is_preserved() {
        let store = MemoryStore::new();
        for name in ["first", "second", "third"] {
            store.append(NewComment::new(name, "x")).await.unwrap();
        }
        let names: Vec<_> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete("missing").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update("missing", CommentPatch::default()).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("missing").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemoryStore::new();
        let a = store.append(NewComment::new("a", "1")).await.unwrap();
        store.append(NewComment::new("b", "2")).await.unwrap();

        let removed = store.delete(&a.comment.id).await.unwrap();
        assert_eq!(removed.id, a.comment.id);
        assert_eq!(store.len().await.unwrap(), 1);

        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..200 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append(NewComment::new(format!("user-{i}"), "hi"))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap().comment.id);
        }
        assert_eq!(ids.len(), 200);
        assert_eq!(store.all().await.unwrap().len(), 200);
    }
}
