use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::usecases::{access_control::AccessError, subscriptions::SubscriptionError};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    /// The identical request may succeed later.
    pub retryable: bool,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable(_) | AppError::Internal(_))
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::LedgerUnavailable(_) => AppError::Unavailable(err.to_string()),
            SubscriptionError::NotFound(msg) => AppError::NotFound(msg),
            SubscriptionError::Rejected(msg) => AppError::Unprocessable(msg),
            SubscriptionError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Anonymous => AppError::Unauthorized(err.to_string()),
            AccessError::Forbidden => AppError::Forbidden(err.to_string()),
            AccessError::InvalidRequest(msg) => AppError::BadRequest(msg),
            AccessError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();
        let message = match &self {
            AppError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
            retryable,
        });

        (status, body).into_response()
    }
}
