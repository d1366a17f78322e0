use async_trait::async_trait;
use plaudit_core::config::StoreBackend;
use plaudit_core::{Comment, CommentPatch, NewComment};
use serde::Serialize;

use crate::error::Result;

/// Result of a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appended {
    /// The finalized record as stored.
    pub comment: Comment,
    /// 0-based position in insertion order at the time of the append.
    pub index: usize,
    /// Collection length right after the append.
    pub total: usize,
}

/// The authoritative ordered collection of comments.
///
/// Both backends keep insertion order, assign ids and server timestamps,
/// and serialize every mutation behind a single guard so concurrent callers
/// never share an id or lose an update.
#[async_trait]
pub trait CommentStore: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Fill missing `id`/`timestamp`, append, return the stored record.
    async fn append(&self, candidate: NewComment) -> Result<Appended>;

    /// Owned copy of the whole collection in insertion order.
    async fn all(&self) -> Result<Vec<Comment>>;

    async fn get(&self, id: &str) -> Result<Comment>;

    /// Merge `patch` into the record and refresh its timestamp.
    async fn update(&self, id: &str, patch: CommentPatch) -> Result<Comment>;

    /// Remove and return the record. Its id is never handed out again.
    async fn delete(&self, id: &str) -> Result<Comment>;

    /// Empty the collection, returning how many records were dropped.
    async fn clear(&self) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}
