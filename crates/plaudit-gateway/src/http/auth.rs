use axum::http::HeaderMap;
use plaudit_core::PlauditError;
use tracing::warn;

use crate::app::AppState;

/// Gate for administrative routes.
///
/// With `admin.token` unset every request passes; otherwise the request must
/// carry `Authorization: Bearer <token>`.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), PlauditError> {
    let Some(expected) = state.config.admin.token.as_deref() else {
        return Ok(());
    };
    match extract_bearer(headers) {
        Some(token) if token == expected => Ok(()),
        _ => {
            warn!("admin request rejected");
            Err(PlauditError::Unauthorized)
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
