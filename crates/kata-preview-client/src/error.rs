//! Client error types.

use kata_preview_core::ErrorKind;

/// Errors that can occur when using the kata preview client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The caller is not signed in or the token was rejected.
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        /// Server message.
        message: String,
    },

    /// The monthly preview budget is at or near its cap.
    #[error("{message}")]
    BudgetExhausted {
        /// Spend for the current period.
        spent_usd: f64,
        /// The monthly cap.
        budget_usd: f64,
        /// Server message.
        message: String,
    },

    /// The provider account is out of quota.
    #[error("{message}")]
    UpstreamQuotaExceeded {
        /// Server message.
        message: String,
    },

    /// The provider is rate limiting; retry later.
    #[error("{message}")]
    UpstreamRateLimited {
        /// Server message.
        message: String,
    },

    /// The provider returned output that failed validation.
    #[error("{message}")]
    UpstreamMalformedResponse {
        /// Server message.
        message: String,
    },

    /// Server returned any other error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// The service error class, when the server reported one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Unauthenticated { .. } => Some(ErrorKind::Unauthenticated),
            Self::BudgetExhausted { .. } => Some(ErrorKind::BudgetExhausted),
            Self::UpstreamQuotaExceeded { .. } => Some(ErrorKind::UpstreamQuotaExceeded),
            Self::UpstreamRateLimited { .. } => Some(ErrorKind::UpstreamRateLimited),
            Self::UpstreamMalformedResponse { .. } => Some(ErrorKind::UpstreamMalformedResponse),
            Self::Api { code, .. } => ErrorKind::from_code(code),
            Self::Http(_) | Self::Serialization(_) => None,
        }
    }

    /// Whether repeating the same request later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_retryable)
    }
}
