//! Error types and handling for the application layer

use crate::search::SearchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::ConfigError(_) => "config_error",
            AppError::Search(_) => "invalid_query",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Search(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConfigError(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidInput(_) | AppError::Search(_) => 1,
            AppError::NotFound(_) => 3,
            _ => 5,
        }
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(err) => AppError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Map an arbitrary error chain to a CLI exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(app) => app.exit_code(),
        None if err.downcast_ref::<SearchError>().is_some() => 1,
        None => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let error = AppError::InvalidInput("empty key".to_string());
        assert_eq!(error.to_string(), "Invalid input: empty key");

        let error = AppError::NotFound("record abc".to_string());
        assert_eq!(error.to_string(), "Not found: record abc");
    }

    #[test]
    fn test_error_codes_and_status() {
        let error = AppError::NotFound("x".to_string());
        assert_eq!(error.error_code(), "not_found");
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.exit_code(), 3);

        let error: AppError = SearchError::InvalidClause {
            index: 0,
            reason: "property is empty".to_string(),
        }
        .into();
        assert_eq!(error.error_code(), "invalid_query");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_from_anyhow_keeps_app_error() {
        let err = anyhow::Error::new(AppError::NotFound("k".to_string()));
        let app: AppError = err.into();
        assert!(matches!(app, AppError::NotFound(_)));

        let app: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(app, AppError::Internal(_)));
    }

    #[test]
    fn test_exit_code_for() {
        let err = anyhow::Error::new(AppError::InvalidInput("x".to_string()));
        assert_eq!(exit_code_for(&err), 1);
        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 5);
    }
}
