//! Comment endpoints.
//!
//! `POST /comments` and `GET /comments` serve submitters and dashboards.
//! The `/comments/{id}` PATCH/DELETE routes and `DELETE /comments` are
//! administrative helpers, gated by `admin.token` when configured.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use plaudit_core::{Comment, CommentDraft, CommentPatch};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::http::auth::require_admin;
use crate::http::error::ApiError;
use crate::ingest::{self, Ack};

#[derive(Serialize)]
pub struct CommentReply {
    pub success: bool,
    pub comment: Comment,
}

#[derive(Serialize)]
pub struct ClearReply {
    pub success: bool,
    pub removed: usize,
}

/// POST /comments: store the comment, then broadcast it.
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CommentDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    let Json(draft) = body?;
    let ack = ingest::submit(&state, draft).await?;
    Ok((StatusCode::CREATED, Json(ack)))
}

/// GET /comments: bare array in insertion order.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(ingest::snapshot(&state).await?))
}

/// GET /comments/{id}
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// PATCH /comments/{id}: merge `name`/`comment`, refresh the timestamp.
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<CommentPatch>, JsonRejection>,
) -> Result<Json<CommentReply>, ApiError> {
    require_admin(&state, &headers)?;
    let Json(patch) = body?;
    let patch = patch.validate()?;

    let comment = state.store.update(&id, patch).await?;
    info!(id = %comment.id, "comment updated");
    Ok(Json(CommentReply {
        success: true,
        comment,
    }))
}

/// DELETE /comments/{id}
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CommentReply>, ApiError> {
    require_admin(&state, &headers)?;

    let comment = state.store.delete(&id).await?;
    info!(id = %comment.id, "comment deleted");
    Ok(Json(CommentReply {
        success: true,
        comment,
    }))
}

/// DELETE /comments: administrative reset.
pub async fn clear_comments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ClearReply>, ApiError> {
    require_admin(&state, &headers)?;

    let removed = state.store.clear().await?;
    info!(removed, "comment store cleared");
    Ok(Json(ClearReply {
        success: true,
        removed,
    }))
}
