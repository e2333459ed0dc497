//! Translation of provider failures into the preview error taxonomy.
//!
//! The provider signals failures through an HTTP status and a free-text
//! message. Every failure is first normalized into an [`UpstreamFailure`]
//! and then classified by [`translate_upstream`], so callers never depend
//! on the provider's wire shape.

use serde::Deserialize;

use crate::error::PreviewError;

/// Phrase the provider uses when the account's quota or billing is exhausted.
const QUOTA_PHRASE: &str = "exceeded your current quota";

/// Provider error code for quota exhaustion.
const QUOTA_CODE: &str = "insufficient_quota";

/// HTTP status used by the provider for rate limiting.
const RATE_LIMIT_STATUS: u16 = 429;

/// A normalized provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// Human-readable message.
    pub message: String,
    /// Provider error code, if any.
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl UpstreamFailure {
    /// A failure that never produced an HTTP response.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            code: None,
        }
    }

    /// Normalize a non-success response body.
    ///
    /// Understands the provider's `{"error": {"message", "code"}}` envelope
    /// and falls back to the raw body text.
    #[must_use]
    pub fn from_error_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self {
                status: Some(status),
                message: envelope.error.message.unwrap_or_default(),
                code: envelope.error.code.and_then(|code| match code {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                }),
            },
            Err(_) => Self {
                status: Some(status),
                message: body.trim().to_string(),
                code: None,
            },
        }
    }

    fn is_quota_exhausted(&self) -> bool {
        self.code.as_deref() == Some(QUOTA_CODE)
            || self.message.to_lowercase().contains(QUOTA_PHRASE)
    }
}

/// Classify a provider failure.
///
/// Quota exhaustion takes precedence over rate limiting because the provider
/// reports both with status 429.
#[must_use]
pub fn translate_upstream(failure: &UpstreamFailure) -> PreviewError {
    if failure.is_quota_exhausted() {
        return PreviewError::UpstreamQuotaExceeded;
    }
    if failure.status == Some(RATE_LIMIT_STATUS) {
        return PreviewError::UpstreamRateLimited;
    }
    if failure.message.is_empty() {
        PreviewError::InternalUnknown("Unknown error".to_string())
    } else {
        PreviewError::InternalUnknown(failure.message.clone())
    }
}
