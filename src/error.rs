use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt::Display;
use tracing::error;

use crate::envelope::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    Validation,
    Conflict,
    Config,
    MissingInput,
    UnsupportedFormat,
    Encoding,
    Delivery,
    Storage,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidState | ErrorKind::Validation | ErrorKind::MissingInput => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::Config => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Delivery => StatusCode::BAD_GATEWAY,
            ErrorKind::Encoding | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingInput, message)
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFormat, message)
    }

    pub fn storage<E: Display>(error: E) -> Self {
        Self::new(ErrorKind::Storage, error.to_string())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            error!(kind = ?self.kind, message = %self.message, "request failed");
        }
        let body = Json(ApiResponse::<()>::error(self.message));
        (status, body).into_response()
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found("resource not found"),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => AppError::conflict(info.message().to_string()),
            _ => AppError::storage(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::storage(format!("{value:#}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::storage(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::validation(value.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        AppError::new(ErrorKind::Encoding, format!("worker task failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_map_to_not_found() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn severity_classes_follow_kind() {
        assert!(ErrorKind::Validation.status().is_client_error());
        assert!(ErrorKind::UnsupportedFormat.status().is_client_error());
        assert!(ErrorKind::Delivery.status().is_server_error());
        assert!(ErrorKind::Config.status().is_server_error());
        assert!(ErrorKind::Storage.status().is_server_error());
    }
}
