//! Ingestion and snapshot: shared by the HTTP routes and the WS channel.

use plaudit_core::{Comment, CommentDraft, PlauditError};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppState;

/// Acknowledgment returned to a submitter once the comment is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub success: bool,
    pub comment: Comment,
    pub total_entries: usize,
    pub index: usize,
}

/// Store first, fan out second.
///
/// Nothing is published when the store rejects the write.
pub async fn submit(app: &AppState, draft: CommentDraft) -> Result<Ack, PlauditError> {
    let candidate = draft.validate(app.config.ingest.legacy_client_ids)?;

    let appended = app.store.append(candidate).await.map_err(|e| {
        warn!(error = %e, "comment append failed");
        PlauditError::from(e)
    })?;

    let delivered = app.hub.publish(&appended.comment);
    info!(
        id = %appended.comment.id,
        index = appended.index,
        total = appended.total,
        delivered,
        "comment ingested"
    );

    Ok(Ack {
        success: true,
        comment: appended.comment,
        total_entries: appended.total,
        index: appended.index,
    })
}

/// Full store contents in insertion order.
pub async fn snapshot(app: &AppState) -> Result<Vec<Comment>, PlauditError> {
    app.store.all().await.map_err(|e| {
        warn!(error = %e, "snapshot read failed");
        PlauditError::from(e)
    })
}
