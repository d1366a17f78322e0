use std::collections::HashSet;

use chrono::{DateTime, Utc};
use plaudit_core::types::new_comment_id;
use plaudit_core::{Comment, CommentPatch, NewComment};
use serde::Deserialize;

use crate::store::Appended;

/// Ordered in-memory comment collection shared by both backends.
///
/// Holds no lock of its own; callers wrap it in whatever guard their
/// backend uses.
#[derive(Debug, Clone, Default)]
pub struct CommentLog {
    comments: Vec<Comment>,
    /// Last server-assigned timestamp, so the clock never appears to run backwards.
    last_stamp: Option<DateTime<Utc>>,
}

impl CommentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the timestamp high-water mark from the loaded records, so a
    /// clock that stepped back across a restart cannot stamp new records
    /// before persisted ones.
    pub fn from_comments(comments: Vec<Comment>) -> Self {
        let last_stamp = comments.iter().map(|c| c.timestamp).max();
        Self {
            comments,
            last_stamp,
        }
    }

    /// Swap in freshly loaded contents, keeping the timestamp high-water mark.
    pub fn replace(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn append(&mut self, candidate: NewComment) -> Appended {
        let id = match candidate.id {
            Some(id) if !self.contains(&id) => id,
            _ => self.fresh_id(),
        };
        let timestamp = match candidate.timestamp {
            Some(ts) => ts,
            None => self.stamp(),
        };

        let comment = Comment {
            id,
            name: candidate.name,
            comment: candidate.comment,
            timestamp,
        };
        self.comments.push(comment.clone());

        Appended {
            comment,
            index: self.comments.len() - 1,
            total: self.comments.len(),
        }
    }

    pub fn update(&mut self, id: &str, patch: &CommentPatch) -> Option<Comment> {
        let pos = self.position(id)?;
        let timestamp = self.stamp();
        let target = &mut self.comments[pos];
        patch.apply_to(target);
        target.timestamp = timestamp;
        Some(target.clone())
    }

    pub fn remove(&mut self, id: &str) -> Option<Comment> {
        let pos = self.position(id)?;
        Some(self.comments.remove(pos))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.comments.len();
        self.comments.clear();
        removed
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.comments.iter().position(|c| c.id == id)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = new_comment_id();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Current wall-clock time, clamped to the previous server stamp.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_stamp {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_stamp = Some(ts);
        ts
    }
}

/// On-disk record shape. Tolerates files written before ids existed.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Turn raw records into comments, assigning ids and timestamps where
/// missing and re-keying duplicate ids. Returns the number of repaired records.
pub(crate) fn repair_records(records: Vec<StoredRecord>) -> (Vec<Comment>, usize) {
    let loaded_at = Utc::now();
    let mut seen = HashSet::with_capacity(records.len());
    let mut repaired = 0;

    let comments = records
        .into_iter()
        .map(|rec| {
            let id = match rec.id.filter(|id| !id.trim().is_empty()) {
                Some(id) if !seen.contains(&id) => id,
                _ => {
                    repaired += 1;
                    let mut id = new_comment_id();
                    while seen.contains(&id) {
                        id = new_comment_id();
                    }
                    id
                }
            };
            seen.insert(id.clone());

            let timestamp = rec.timestamp.unwrap_or_else(|| {
                repaired += 1;
                loaded_at
            });

            Comment {
                id,
                name: rec.name,
                comment: rec.comment,
                timestamp,
            }
        })
        .collect();

    (comments, repaired)
}
