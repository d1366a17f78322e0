use plaudit_core::CommentDraft;
use plaudit_protocol::{
    frames::{Frame, FrameHead, ReqFrame, ResFrame},
    names::{COMMENT_SUBMIT, PING},
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::ingest;

/// Process one inbound WS text frame.
///
/// Returns the response frame to send back to this client, if any. A `req`
/// whose body does not parse is answered with `INVALID_FRAME`; anything else
/// that is malformed, and every non-request frame, is logged and ignored.
pub async fn handle(observer_id: &str, text: &str, app: &AppState) -> Option<ResFrame> {
    match Frame::parse(text) {
        Ok(Frame::Req(req)) => Some(route(observer_id, &req, app).await),
        Ok(other) => {
            debug!(observer_id, kind = other.kind(), "ignoring non-request frame");
            None
        }
        Err(e) => match serde_json::from_str::<FrameHead>(text) {
            Ok(FrameHead::Req { id }) => {
                debug!(observer_id, id = %id, error = %e, "bad request envelope");
                Some(ResFrame::err(id, "INVALID_FRAME", e.to_string()))
            }
            _ => {
                warn!(observer_id, error = %e, "malformed frame");
                None
            }
        },
    }
}

async fn route(observer_id: &str, req: &ReqFrame, app: &AppState) -> ResFrame {
    match req.method.as_str() {
        PING => ResFrame::ok(&req.id, serde_json::json!({ "pong": true })),

        // Ingest like POST /comments; the broadcast mirrors it to every
        // observer, this one included.
        COMMENT_SUBMIT => {
            let draft = match req.params_as::<CommentDraft>() {
                Ok(d) => d,
                Err(e) => return ResFrame::err(&req.id, "VALIDATION_ERROR", e.to_string()),
            };
            match ingest::submit(app, draft).await {
                Ok(ack) => ResFrame::ok(&req.id, ack),
                Err(e) => {
                    if e.is_client_error() {
                        debug!(observer_id, error = %e, "comment-submit rejected");
                    } else {
                        warn!(observer_id, error = %e, "comment-submit failed");
                    }
                    ResFrame::err(&req.id, e.code(), e.to_string())
                }
            }
        }

        other => {
            warn!(observer_id, method = other, "unknown method");
            ResFrame::err(&req.id, "METHOD_NOT_FOUND", format!("Method not found: {other}"))
        }
    }
}
