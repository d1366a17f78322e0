//! Frames on the real-time channel.
//!
//! Every message is one JSON object discriminated by its `type` field:
//! `req` (observer to server), `res` (the answer to a `req`) and `event`
//! (server push). [`Frame`] is the only thing that ever goes over the
//! socket; the per-kind structs carry no `type` of their own.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Req(ReqFrame),
    Res(ResFrame),
    Event(EventFrame),
}

impl Frame {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Req(_) => "req",
            Frame::Res(_) => "res",
            Frame::Event(_) => "event",
        }
    }

    pub fn into_event(self) -> Option<EventFrame> {
        match self {
            Frame::Event(ev) => Some(ev),
            _ => None,
        }
    }
}

impl From<ReqFrame> for Frame {
    fn from(req: ReqFrame) -> Self {
        Frame::Req(req)
    }
}

impl From<ResFrame> for Frame {
    fn from(res: ResFrame) -> Self {
        Frame::Res(res)
    }
}

impl From<EventFrame> for Frame {
    fn from(ev: EventFrame) -> Self {
        Frame::Event(ev)
    }
}

/// The part of a frame needed to answer a request whose body failed to parse.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FrameHead {
    Req { id: String },
    #[serde(other)]
    Other,
}

/// `{"type":"req","id":"r-1","method":"comment-submit","params":{...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReqFrame {
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ReqFrame {
    /// Decode `params` into `T`. Absent params decode from an empty object.
    pub fn params_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match &self.params {
            Some(params) => T::deserialize(params),
            None => serde_json::from_value(Value::Object(Default::default())),
        }
    }
}

/// `{"type":"res","id":"r-1","ok":true,"payload":{...}}` or, on failure,
/// `{"type":"res","id":"r-1","ok":false,"error":{"code":..,"message":..}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResFrame {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResFrame {
    pub fn ok(id: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(ErrorShape {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

/// `{"type":"event","event":"comment-created","payload":{...},"seq":42}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            event: event.into(),
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            seq: None,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Decode the payload into `T`, if present and well-formed.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|p| T::deserialize(p).ok())
    }
}
