use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plaudit_core::config::MAX_PAYLOAD_BYTES;
use plaudit_core::PlauditError;
use serde::Serialize;
use tracing::warn;

/// Failure body shared by every route: `{"success": false, "error": "..."}`.
#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// HTTP-facing wrapper that maps the error taxonomy onto status codes.
#[derive(Debug)]
pub struct ApiError(pub PlauditError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PlauditError::Validation(_) => StatusCode::BAD_REQUEST,
            PlauditError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlauditError::Unauthorized => StatusCode::UNAUTHORIZED,
            PlauditError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlauditError> for ApiError {
    fn from(err: PlauditError) -> Self {
        Self(err)
    }
}

impl From<plaudit_store::StoreError> for ApiError {
    fn from(err: plaudit_store::StoreError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Oversized bodies surface as a buffering failure with status 413.
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self(PlauditError::PayloadTooLarge {
                max: MAX_PAYLOAD_BYTES,
            });
        }
        Self(PlauditError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.0.is_client_error() {
            warn!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
