//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use kata_preview_core::{BudgetDenial, ErrorKind, PreviewError};
use kata_preview_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A preview generation failure, mapped by its kind.
    #[error(transparent)]
    Preview(#[from] PreviewError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Preview(err) => preview_status(err.kind()),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

const fn preview_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::BudgetExhausted => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamQuotaExceeded => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::UpstreamRateLimited => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UpstreamMalformedResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::InternalUnknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn preview_details(err: &PreviewError) -> Option<serde_json::Value> {
    match err {
        PreviewError::BudgetExhausted {
            denial,
            spent_usd,
            budget_usd,
        } => Some(serde_json::json!({
            "spentUSD": spent_usd,
            "budgetUSD": budget_usd,
            "nearCap": matches!(denial, BudgetDenial::NearCap),
        })),
        PreviewError::UpstreamRateLimited => Some(serde_json::json!({ "retryable": true })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, details) = match &self {
            Self::Unauthorized => (
                ErrorKind::Unauthenticated.code(),
                PreviewError::Unauthenticated.to_string(),
                None,
            ),
            Self::BadRequest(msg) => ("bad_request", msg.clone(), None),
            Self::Preview(err) => {
                if let PreviewError::InternalUnknown(msg) = err {
                    tracing::error!(error = %msg, "Preview failed with internal error");
                }
                (err.kind().code(), err.to_string(), preview_details(err))
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    ErrorKind::InternalUnknown.code(),
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => ("external_service_error", msg.clone(), None),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(msg)
            | StoreError::Serialization(msg)
            | StoreError::InvalidAmount(msg) => Self::Internal(msg),
        }
    }
}
