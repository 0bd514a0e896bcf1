//! Failure taxonomy for every remote operation.
//!
//! The accessor classifies HTTP outcomes into this enum once, at the
//! boundary; stores and callers only ever see these variants.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("validation failed{}", detail(.0))]
    Validation(Option<String>),
    #[error("unauthorized{}", detail(.0))]
    Unauthorized(Option<String>),
    #[error("forbidden{}", detail(.0))]
    Forbidden(Option<String>),
    #[error("not found{}", detail(.0))]
    NotFound(Option<String>),
    #[error("conflict{}", detail(.0))]
    Conflict(Option<String>),
    #[error("rate limited{}", detail(.0))]
    RateLimited(Option<String>),
    #[error("server error{}", detail(.0))]
    ServerError(Option<String>),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected failure{}", detail(.0))]
    Unknown(Option<String>),
}

fn detail(msg: &Option<String>) -> String {
    match msg {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

impl ApiError {
    /// Map a non-success HTTP status and optional server message into a
    /// classified failure.
    pub fn classify(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(message),
            s if s.is_server_error() => ApiError::ServerError(message),
            _ => ApiError::Unknown(message),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Human-readable message from the server, when one was attached.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::RateLimited(m)
            | ApiError::ServerError(m)
            | ApiError::Unknown(m) => m.as_deref(),
            ApiError::Network(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}
