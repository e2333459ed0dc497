//! Error taxonomy for preview generation.

use serde::{Deserialize, Serialize};

/// Result type for preview operations.
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Why the budget refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDenial {
    /// Spend is at or beyond the cap.
    OverCap,
    /// A worst-case call could push spend beyond the cap.
    NearCap,
}

/// Errors surfaced to callers of preview generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreviewError {
    /// The caller has no authenticated identity.
    #[error("Sign in to generate kata previews.")]
    Unauthenticated,

    /// The monthly budget does not admit another call.
    #[error("{}", budget_message(.denial, .spent_usd, .budget_usd))]
    BudgetExhausted {
        /// Over or near the cap.
        denial: BudgetDenial,
        /// Spend for the current period.
        spent_usd: f64,
        /// The monthly cap.
        budget_usd: f64,
    },

    /// The provider account ran out of quota or billing credit.
    #[error("OpenAI API quota/budget exceeded for this API key. Add billing/credits and try again.")]
    UpstreamQuotaExceeded,

    /// The provider is rate limiting requests.
    #[error("OpenAI rate limit hit. Please retry in a moment.")]
    UpstreamRateLimited,

    /// The provider's structured output could not be parsed or validated.
    #[error("malformed kata response: {0}")]
    UpstreamMalformedResponse(String),

    /// Anything else.
    #[error("{0}")]
    InternalUnknown(String),
}

fn budget_message(denial: &BudgetDenial, spent_usd: &f64, budget_usd: &f64) -> String {
    match denial {
        BudgetDenial::OverCap => {
            format!("Monthly preview budget reached (${spent_usd:.2} / ${budget_usd:.2}).")
        }
        BudgetDenial::NearCap => format!(
            "Monthly preview budget nearly reached (${spent_usd:.2} / ${budget_usd:.2}). Try again next month."
        ),
    }
}

impl PreviewError {
    /// The caller-visible class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::BudgetExhausted { .. } => ErrorKind::BudgetExhausted,
            Self::UpstreamQuotaExceeded => ErrorKind::UpstreamQuotaExceeded,
            Self::UpstreamRateLimited => ErrorKind::UpstreamRateLimited,
            Self::UpstreamMalformedResponse(_) => ErrorKind::UpstreamMalformedResponse,
            Self::InternalUnknown(_) => ErrorKind::InternalUnknown,
        }
    }
}

/// Caller-visible error classes with stable wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No valid caller identity.
    Unauthenticated,
    /// Monthly budget at or near the cap.
    BudgetExhausted,
    /// Provider quota or billing exhausted.
    UpstreamQuotaExceeded,
    /// Provider rate limiting.
    UpstreamRateLimited,
    /// Structured output failed to parse or validate.
    UpstreamMalformedResponse,
    /// Anything else.
    #[serde(rename = "internal")]
    InternalUnknown,
}

impl ErrorKind {
    /// The stable wire code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::BudgetExhausted => "budget_exhausted",
            Self::UpstreamQuotaExceeded => "upstream_quota_exceeded",
            Self::UpstreamRateLimited => "upstream_rate_limited",
            Self::UpstreamMalformedResponse => "upstream_malformed_response",
            Self::InternalUnknown => "internal",
        }
    }

    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "unauthenticated" => Some(Self::Unauthenticated),
            "budget_exhausted" => Some(Self::BudgetExhausted),
            "upstream_quota_exceeded" => Some(Self::UpstreamQuotaExceeded),
            "upstream_rate_limited" => Some(Self::UpstreamRateLimited),
            "upstream_malformed_response" => Some(Self::UpstreamMalformedResponse),
            "internal" => Some(Self::InternalUnknown),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request later.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::UpstreamRateLimited)
    }
}
