//! Request and response types for the kata preview API.

use serde::{Deserialize, Serialize};

use kata_preview_core::{Decision, PeriodKey, UsageRecord};

pub use kata_preview_core::{
    Difficulty, GenerationRequest, KataCandidate, KataLength, KataRecord, Language, PreviewMeta,
    PreviewResult, UsageSummary,
};

/// Spend for the current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    /// Current period.
    pub month: PeriodKey,
    /// Successful calls this period.
    pub call_count: u64,
    /// Input tokens this period.
    pub tokens_in: u64,
    /// Output tokens this period.
    pub tokens_out: u64,
    /// Spend, rounded for display.
    #[serde(rename = "spentUSD")]
    pub spent_usd: f64,
    /// Monthly cap.
    #[serde(rename = "budgetUSD")]
    pub budget_usd: f64,
    /// Cap minus spend.
    #[serde(rename = "remainingUSD")]
    pub remaining_usd: f64,
    /// Whether the next call would be admitted.
    pub decision: Decision,
}

/// Recorded periods, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Usage records.
    pub periods: Vec<UsageRecord>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
