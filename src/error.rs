use thiserror::Error;

pub type Result<T> = std::result::Result<T, PathwayError>;

#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("Malformed event '{code}': {reason}")]
    MalformedEvent { code: String, reason: String },

    #[error("Prediction unavailable: {0}")]
    PredictionUnavailable(String),

    #[error("Root expansion failed: {0}")]
    RootExpansion(Box<PathwayError>),

    #[error("Invalid expansion config: {0}")]
    InvalidConfig(String),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PathwayError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        PathwayError::PredictionUnavailable(message.into())
    }
}
