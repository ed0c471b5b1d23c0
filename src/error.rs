use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Every way a single extraction attempt can fail. None of these are fatal:
/// the cache keeps serving the last good prices and records the message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("page structure not recognized: {0}")]
    StructuralParse(String),

    #[error("could not extract price: no plausible candidate after {heuristics} heuristics")]
    NoPlausibleCandidate { heuristics: usize },

    #[error("extraction timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExtractionError::Network(format!("request timed out: {e}"))
        } else {
            ExtractionError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid price: {0}")]
    InvalidManualInput(String),

    #[error("Invalid premiums: {0}")]
    InvalidPremiums(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidManualInput(_) | AppError::InvalidPremiums(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
