//! Error types for the competitive intelligence advisor

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Request Errors
    // =============================

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    // =============================
    // Tool Errors
    // =============================

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool {tool} could not fetch upstream data: {reason}")]
    ToolFetch { tool: String, reason: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Provider / Storage Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdvisorError {
    /// HTTP status used when this error reaches the API layer
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdvisorError::InvalidRequest(_) | AdvisorError::InvalidSession(_) => {
                StatusCode::BAD_REQUEST
            }
            AdvisorError::LlmError(_) => StatusCode::BAD_GATEWAY,
            AdvisorError::DatabaseError(_) | AdvisorError::SqlError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AdvisorError::InvalidRequest("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdvisorError::LlmError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AdvisorError::DatabaseError("gone".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AdvisorError::ToolNotFound("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_fetch_error_message() {
        let err = AdvisorError::ToolFetch {
            tool: "get_company_news".into(),
            reason: "rate limited (429)".into(),
        };
        assert!(err.to_string().contains("get_company_news"));
        assert!(err.to_string().contains("429"));
    }
}
