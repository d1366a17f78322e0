use plaudit_core::PlauditError;
use thiserror::Error;

/// Errors that can occur during comment store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No comment with this id exists in the store.
    #[error("comment not found: {id}")]
    NotFound { id: String },

    /// Reading or writing the data file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The data file exists but does not hold a JSON array of comments.
    #[error("corrupt data file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for PlauditError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => PlauditError::NotFound { id },
            other => PlauditError::Persistence(other.to_string()),
        }
    }
}
