//! Dashboard reconciler: the client side of the real-time channel.
//!
//! A dashboard seeds its view from `GET /comments`, then folds every
//! `comment-created` event on top. The same comment can arrive twice (once
//! in the snapshot, once more on the live stream), so merging is keyed by
//! `id` and the most recently observed copy replaces the older one.

use std::cmp::Ordering;
use std::collections::HashMap;

use plaudit_core::Comment;
use tracing::warn;

use crate::frames::EventFrame;
use crate::names::COMMENT_CREATED;

#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    by_id: HashMap<String, Comment>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view with a fresh snapshot.
    pub fn seed(&mut self, snapshot: impl IntoIterator<Item = Comment>) {
        self.by_id.clear();
        for comment in snapshot {
            self.by_id.insert(comment.id.clone(), comment);
        }
    }

    /// Merge one comment. Returns true if its id was not in the view yet.
    pub fn merge(&mut self, comment: Comment) -> bool {
        self.by_id.insert(comment.id.clone(), comment).is_none()
    }

    /// Fold a live event into the view. Events other than
    /// `comment-created` are ignored and return false.
    pub fn apply_event(&mut self, event: &EventFrame) -> bool {
        if event.event != COMMENT_CREATED {
            return false;
        }
        match event.payload_as::<Comment>() {
            Some(comment) => self.merge(comment),
            None => {
                warn!(seq = ?event.seq, "comment-created event without a valid comment payload");
                false
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Display order: newest `timestamp` first, ties broken by `id`
    /// (descending) so repeated renders are stable.
    pub fn ordered(&self) -> Vec<Comment> {
        let mut out: Vec<Comment> = self.by_id.values().cloned().collect();
        out.sort_by(display_order);
        out
    }
}

fn display_order(a: &Comment, b: &Comment) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}
