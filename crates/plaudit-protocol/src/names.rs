// Well-known event and method names on the real-time channel.

// server -> observer events
pub const COMMENT_CREATED: &str = "comment-created";
pub const CONNECTED: &str = "connected";
pub const TICK: &str = "tick";

// client -> server methods
pub const COMMENT_SUBMIT: &str = "comment-submit";
pub const PING: &str = "ping";
