pub mod config;
pub mod error;
pub mod types;

pub use error::{PlauditError, Result};
pub use types::{Comment, CommentDraft, CommentPatch, NewComment};
