//! Durable backend: a single pretty-printed JSON array on disk.
//!
//! The file is the unit of consistency: every mutation reloads it, applies
//! the change and writes the whole array back, all under one process-wide
//! mutex. Writes go to a sibling `.tmp` file first and are renamed into
//! place, so a reader never observes a half-written array.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plaudit_core::config::StoreBackend;
use plaudit_core::{Comment, CommentPatch, NewComment};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, StoreError};
use crate::log::{repair_records, CommentLog, StoredRecord};
use crate::store::{Appended, CommentStore};

pub struct FileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

struct FileState {
    /// Last known contents. After a failed write this holds the computed
    /// (not durable) result until the next reload.
    log: CommentLog,
    /// Whether the data file is known to exist.
    created: bool,
}

/// Outcome of reading the data file.
enum Disk {
    Missing,
    Unreadable(StoreError),
    /// Parsed contents; `repaired` is set when ids or timestamps were backfilled.
    Ready { comments: Vec<Comment>, repaired: bool },
}

impl FileStore {
    /// Open (or lazily create) the data file at `path`.
    ///
    /// A missing file starts empty and is created on first access. A corrupt
    /// or unreadable file is logged, treated as empty and recreated.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }

        let (log, created) = match read_file(&path).await {
            Disk::Ready { comments, repaired } => {
                info!(path = %path.display(), count = comments.len(), "loaded comments");
                // Pin backfilled ids on disk so they survive a restart.
                if repaired {
                    if let Err(e) = write_file(&path, &comments).await {
                        warn!(path = %path.display(), error = %e, "could not write repaired records");
                    }
                }
                (CommentLog::from_comments(comments), true)
            }
            Disk::Missing => {
                info!(path = %path.display(), "data file missing, will create on first access");
                (CommentLog::new(), false)
            }
            Disk::Unreadable(e) => {
                warn!(path = %path.display(), error = %e, "data file unreadable, starting empty");
                let created = match write_file(&path, &[]).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not recreate data file");
                        false
                    }
                };
                (CommentLog::new(), created)
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(FileState { log, created }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the data file into memory, discarding any non-durable state.
    ///
    /// Returns the number of comments loaded. A corrupt file is reported and
    /// the in-memory view is left untouched.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn reload(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        match read_file(&self.path).await {
            Disk::Ready { comments, repaired } => {
                state.log.replace(comments);
                if repaired {
                    self.persist(&mut state).await?;
                }
                state.created = true;
            }
            Disk::Missing => {
                state.log.replace(Vec::new());
                state.created = false;
            }
            Disk::Unreadable(e) => return Err(e),
        }
        Ok(state.log.len())
    }

    /// Bring the cached log in line with the file before a mutation.
    ///
    /// A missing file means an empty collection. An unreadable one keeps
    /// the last-known-good view so a transient read error cannot wipe it.
    async fn refresh(&self, state: &mut FileState) {
        match read_file(&self.path).await {
            Disk::Ready { comments, .. } => {
                state.log.replace(comments);
                state.created = true;
            }
            Disk::Missing => {
                if !state.log.is_empty() {
                    warn!(path = %self.path.display(), "data file disappeared, starting empty");
                }
                state.log.replace(Vec::new());
                state.created = false;
            }
            Disk::Unreadable(e) => {
                warn!(path = %self.path.display(), error = %e, "reload failed, using last known contents");
            }
        }
    }

    /// Write the cached log back in full.
    async fn persist(&self, state: &mut FileState) -> Result<()> {
        write_file(&self.path, state.log.comments()).await?;
        state.created = true;
        Ok(())
    }
}

#[async_trait]
impl CommentStore for FileStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::File
    }

    #[instrument(skip(self, candidate), fields(path = %self.path.display()))]
    async fn append(&self, candidate: NewComment) -> Result<Appended> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        let appended = state.log.append(candidate);
        self.persist(&mut state).await?;
        debug!(id = %appended.comment.id, total = appended.total, "comment appended");
        Ok(appended)
    }

    async fn all(&self) -> Result<Vec<Comment>> {
        let mut state = self.state.lock().await;
        if !state.created {
            // No file means no durable comments; anything cached here is
            // left over from a write that failed.
            write_file(&self.path, &[]).await?;
            state.log.replace(Vec::new());
            state.created = true;
            info!(path = %self.path.display(), "created data file");
        }
        Ok(state.log.comments().to_vec())
    }

    async fn get(&self, id: &str) -> Result<Comment> {
        let state = self.state.lock().await;
        state
            .log
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    #[instrument(skip(self, patch), fields(path = %self.path.display()))]
    async fn update(&self, id: &str, patch: CommentPatch) -> Result<Comment> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        let updated = state
            .log
            .update(id, &patch)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        self.persist(&mut state).await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn delete(&self, id: &str) -> Result<Comment> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        let removed = state
            .log
            .remove(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        self.persist(&mut state).await?;
        Ok(removed)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        let removed = state.log.clear();
        self.persist(&mut state).await?;
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.lock().await.log.len())
    }
}

async fn read_file(path: &Path) -> Disk {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Disk::Missing,
        Err(source) => return Disk::Unreadable(io_error(path, source)),
    };

    // An empty file is what a crashed first write leaves behind.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Disk::Ready {
            comments: Vec::new(),
            repaired: false,
        };
    }

    match serde_json::from_slice::<Vec<StoredRecord>>(&bytes) {
        Ok(records) => {
            let (comments, repaired) = repair_records(records);
            if repaired > 0 {
                info!(path = %path.display(), repaired, "repaired legacy records");
            }
            Disk::Ready {
                comments,
                repaired: repaired > 0,
            }
        }
        Err(source) => Disk::Unreadable(StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        }),
    }
}

async fn write_file(path: &Path, comments: &[Comment]) -> Result<()> {
    let body = serde_json::to_vec_pretty(comments)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = write_then_rename(&tmp, path, &body).await;
    if result.is_err() {
        // Only clean up a regular file; anything else was not left by us.
        if let Ok(meta) = tokio::fs::symlink_metadata(&tmp).await {
            if meta.is_file() {
                if let Err(e) = tokio::fs::remove_file(&tmp).await {
                    debug!(path = %tmp.display(), error = %e, "could not remove temp file");
                }
            }
        }
    }
    result
}

async fn write_then_rename(tmp: &Path, path: &Path, body: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|source| io_error(tmp, source))?;
    file.write_all(body)
        .await
        .map_err(|source| io_error(tmp, source))?;
    file.sync_all()
        .await
        .map_err(|source| io_error(tmp, source))?;
    drop(file);

    tokio::fs::rename(tmp, path)
        .await
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::open(dir.path().join("data.json")).await.unwrap()
    }

    fn tmp_path(store: &FileStore) -> PathBuf {
        let mut tmp = store.path().as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    #[tokio::test]
    async fn snapshot_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        assert!(!store.path().exists());

        let all = store.all().await.unwrap();
        assert!(all.is_empty());
        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(on_disk, "[]");
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/data.json");
        let store = FileStore::open(&path).await.unwrap();
        store.append(NewComment::new("Ali", "hi")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn appends_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let store = store_in(&dir).await;
            store
                .append(NewComment::new("Ali", "Great session"))
                .await
                .unwrap()
        };

        let reopened = store_in(&dir).await;
        let all = reopened.all().await.unwrap();
        assert_eq!(all, vec![first.comment]);
    }

    #[tokio::test]
    async fn file_is_pretty_printed_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.append(NewComment::new("Ali", "hi")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n  {"));
        let parsed: Vec<Comment> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_empty_and_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn legacy_records_without_ids_are_imported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{"name":"Ali","comment":"hi","timestamp":"2024-11-20T10:00:00.000Z"}]"#,
        )
        .unwrap();

        let store = FileStore::open(&path).await.unwrap();
        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].id.is_empty());
        let fetched = store.get(&all[0].id).await.unwrap();
        assert_eq!(fetched.name, "Ali");

        // the backfilled id is stable across restarts
        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.all().await.unwrap()[0].id, all[0].id);
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.append(NewComment::new("Ali", "hi")).await.unwrap();

        let before = std::fs::read(store.path()).unwrap();
        let modified = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        let err = store.delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert_eq!(
            std::fs::metadata(store.path()).unwrap().modified().unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn update_and_delete_are_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let a = store.append(NewComment::new("Ali", "hi")).await.unwrap();
        let b = store.append(NewComment::new("Sara", "yo")).await.unwrap();

        let patch = CommentPatch {
            name: None,
            comment: Some("edited".into()),
        };
        store.update(&a.comment.id, patch).await.unwrap();
        store.delete(&b.comment.id).await.unwrap();

        let reopened = store_in(&dir).await;
        let all = reopened.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, a.comment.id);
        assert_eq!(all[0].comment, "edited");
    }

    #[tokio::test]
    async fn mutations_pick_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.append(NewComment::new("Ali", "hi")).await.unwrap();

        // Someone replaces the file behind our back.
        std::fs::write(
            store.path(),
            r#"[{"id":"ext","name":"Omar","comment":"external","timestamp":"2024-11-20T10:00:00Z"}]"#,
        )
        .unwrap();

        let appended = store.append(NewComment::new("Sara", "yo")).await.unwrap();
        assert_eq!(appended.index, 1);
        assert_eq!(appended.total, 2);
        let ids: Vec<_> = store.all().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids[0], "ext");
    }

    #[tokio::test]
    async fn reload_rejects_corrupt_file_and_keeps_view() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.append(NewComment::new("Ali", "hi")).await.unwrap();

        std::fs::write(store.path(), "garbage").unwrap();
        assert!(matches!(
            store.reload().await,
            Err(StoreError::Corrupt { .. })
        ));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_first_write_is_not_resurrected_by_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let blocker = tmp_path(&store);
        std::fs::create_dir(&blocker).unwrap();

        let err = store.append(NewComment::new("Ali", "lost")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.path().exists());

        std::fs::remove_dir(&blocker).unwrap();
        assert!(store.all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_writes_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let a = store.append(NewComment::new("Ali", "hi")).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();
        let blocker = tmp_path(&store);
        std::fs::create_dir(&blocker).unwrap();

        let err = store.append(NewComment::new("Sara", "lost")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        // the computed record stays cached until the next reload
        assert_eq!(store.len().await.unwrap(), 2);

        let patch = CommentPatch {
            name: None,
            comment: Some("edited".into()),
        };
        let err = store.update(&a.comment.id, patch).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        // that reload dropped the unsaved append
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.get(&a.comment.id).await.unwrap().comment, "edited");

        let err = store.delete(&a.comment.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.len().await.unwrap(), 0);
        assert_eq!(std::fs::read(store.path()).unwrap(), before);

        std::fs::remove_dir(&blocker).unwrap();
        let c = store.append(NewComment::new("Omar", "back")).await.unwrap();
        assert_eq!(c.total, 2);
        assert_eq!(store.all().await.unwrap()[0], a.comment);
    }

    #[tokio::test]
    async fn corrupt_file_during_mutation_keeps_last_known_good() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let a = store.append(NewComment::new("Ali", "hi")).await.unwrap();

        std::fs::write(store.path(), "garbage").unwrap();
        let b = store.append(NewComment::new("Sara", "yo")).await.unwrap();
        assert_eq!(b.total, 2);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let on_disk: Vec<Comment> = serde_json::from_str(&raw).unwrap();
        let ids: Vec<_> = on_disk.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.comment.id, b.comment.id]);
    }

    #[tokio::test]
    async fn failed_rename_cleans_up_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(!tmp_path(&store).exists());

        let err = store.append(NewComment::new("Ali", "hi")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!tmp_path(&store).exists());
    }

    #[tokio::test]
    async fn clear_empties_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.append(NewComment::new("Ali", "hi")).await.unwrap();
        store.append(NewComment::new("Sara", "yo")).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir).await);

        let mut handles = Vec::new();
        for i in 0..25 {
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
        assert_eq!(ids.len(), 25);

        let reopened = store_in(&dir).await;
        assert_eq!(reopened.all().await.unwrap().len(), 25);
    }
}
