use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlauditError, Result};

/// A single submitted record: identity, author name, body text, timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// Fresh comment id (UUIDv7, time-sortable and unique across concurrent callers).
pub fn new_comment_id() -> String {
    Uuid::now_v7().to_string()
}

/// Raw submission as it arrives on the wire.
///
/// Every field is optional so that a missing `name` is reported as a
/// validation failure rather than a deserializer rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// A validated candidate ready for `CommentStore::append`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub id: Option<String>,
    pub name: String,
    pub comment: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewComment {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            comment: comment.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl CommentDraft {
    /// Schema check at the ingestion boundary.
    ///
    /// Trims `name` and `comment` and rejects them when missing or blank.
    /// `timestamp`, when present, must be RFC 3339 / ISO-8601. A client `id`
    /// survives only when `honor_client_id` is set.
    pub fn validate(self, honor_client_id: bool) -> Result<NewComment> {
        let name = required_text("name", self.name)?;
        let comment = required_text("comment", self.comment)?;

        let timestamp = match self.timestamp.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw)?),
        };

        let id = if honor_client_id {
            self.id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
        } else {
            None
        };

        Ok(NewComment {
            id,
            name,
            comment,
            timestamp,
        })
    }
}

/// Administrative partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CommentPatch {
    pub fn validate(self) -> Result<Self> {
        if self.name.is_none() && self.comment.is_none() {
            return Err(PlauditError::Validation(
                "patch must set at least one of name, comment".to_string(),
            ));
        }
        let name = self
            .name
            .map(|n| required_text("name", Some(n)))
            .transpose()?;
        let comment = self
            .comment
            .map(|c| required_text("comment", Some(c)))
            .transpose()?;
        Ok(Self { name, comment })
    }

    /// Merge the provided fields into `target`. Does not touch the timestamp.
    pub fn apply_to(&self, target: &mut Comment) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(comment) = &self.comment {
            target.comment = comment.clone();
        }
    }
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(PlauditError::Validation(format!("{field} cannot be empty"))),
        None => Err(PlauditError::Validation(format!("{field} is required"))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PlauditError::Validation(format!("invalid timestamp {raw:?}: {e}")))
}
