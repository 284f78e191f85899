pub mod pathways;

use crate::error::PathwayError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use pathways::{PathwayService, PathwaysResponse, PredictionsResponse};

/// Progress callback for CLI spinners or any embedding front end
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress events emitted while a pathway tree is being built
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    Started { task: String },
    Progress { task: String, current: u64, total: u64 },
    Message { task: String, message: String },
    Completed { task: String },
    Error { task: String, error: String },
}

/// Result types that can be serialized to JSON
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced at the query boundary
#[derive(Debug, Error, Serialize)]
pub enum ApiError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Body returned to callers when a query fails.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl From<PathwayError> for ApiError {
    fn from(err: PathwayError) -> Self {
        match &err {
            PathwayError::Io(e) => ApiError::Io(e.to_string()),
            PathwayError::MalformedEvent { .. }
            | PathwayError::InvalidConfig(_)
            | PathwayError::Json(_) => ApiError::InvalidInput(err.to_string()),
            _ => ApiError::Expansion(err.to_string()),
        }
    }
}
