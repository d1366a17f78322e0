use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlauditError {
    /// A required field is missing, blank, or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Comment not found: {id}")]
    NotFound { id: String },

    /// The durable backend could not read or write its file.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Request body over the configured limit.
    #[error("Payload too large (max {max} bytes)")]
    PayloadTooLarge { max: usize },
}

impl PlauditError {
    /// Short error code string sent to clients in WS RES frames.
    pub fn code(&self) -> &'static str {
        match self {
            PlauditError::Validation(_) => "VALIDATION_ERROR",
            PlauditError::NotFound { .. } => "NOT_FOUND",
            PlauditError::Persistence(_) => "PERSISTENCE_ERROR",
            PlauditError::Config(_) => "CONFIG_ERROR",
            PlauditError::Unauthorized => "UNAUTHORIZED",
            PlauditError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    /// True for errors caused by the caller's input; the caller should not retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlauditError::Validation(_)
                | PlauditError::NotFound { .. }
                | PlauditError::Unauthorized
                | PlauditError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlauditError>;
