//! Gateway error taxonomy
//!
//! Every handler failure becomes an [`ApiError`]: a closed set of kinds,
//! each mapped to one HTTP status. The `IntoResponse` impl is the single
//! place an error is rendered, so all endpoints share one policy: plain
//! text `message`, with the cause message appended after `" - "` when one
//! is attached.

use crate::core::BlockchainError;
use crate::operator::OperatorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// The closed set of gateway error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A gateway-level error: kind, message and an optional wrapped cause
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub cause: Option<String>,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attach the underlying error, rendered after the message
    pub fn with_cause(mut self, cause: &dyn fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} - {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{self}");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<BlockchainError> for ApiError {
    fn from(err: BlockchainError) -> Self {
        let kind = match err {
            // A stale index means another block got there first
            BlockchainError::InvalidIndex { .. } => ErrorKind::Conflict,
            BlockchainError::DuplicateTransaction(_) => ErrorKind::Conflict,
            _ => ErrorKind::InvalidInput,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<OperatorError> for ApiError {
    fn from(err: OperatorError) -> Self {
        let kind = match err {
            OperatorError::AddressNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::InvalidInput,
        };
        Self::new(kind, err.to_string())
    }
}
