//! Usage records for a billing period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::round_usd;
use crate::period::PeriodKey;

/// Cumulative usage for one billing period.
///
/// Every counter only ever grows. A record that was never written reads as
/// [`UsageRecord::empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// The billing period this record covers.
    pub period: PeriodKey,
    /// Number of successful provider calls.
    pub call_count: u64,
    /// Cumulative input tokens.
    pub tokens_in: u64,
    /// Cumulative output tokens.
    pub tokens_out: u64,
    /// Cumulative spend in USD, at full precision.
    #[serde(rename = "spentUSD")]
    pub spent_usd: f64,
    /// When the record was last incremented.
    pub updated_at: Option<DateTime<Utc>>,
}

impl UsageRecord {
    /// An empty record for a period with no spend yet.
    #[must_use]
    pub fn empty(period: PeriodKey) -> Self {
        Self {
            period,
            call_count: 0,
            tokens_in: 0,
            tokens_out: 0,
            spent_usd: 0.0,
            updated_at: None,
        }
    }

    /// Apply a single successful call to this record.
    pub fn apply(&mut self, delta: &UsageDelta) {
        self.call_count = self.call_count.saturating_add(1);
        self.tokens_in = self.tokens_in.saturating_add(delta.tokens_in);
        self.tokens_out = self.tokens_out.saturating_add(delta.tokens_out);
        self.spent_usd += delta.cost_usd;
        self.updated_at = Some(delta.at);
    }
}

/// The increment committed after one successful provider call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageDelta {
    /// Input tokens reported by the provider.
    pub tokens_in: u64,
    /// Output tokens reported by the provider.
    pub tokens_out: u64,
    /// Exact cost of the call in USD.
    pub cost_usd: f64,
    /// When the call completed.
    pub at: DateTime<Utc>,
}

/// Token counts for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Input tokens.
    #[serde(rename = "in")]
    pub input: u64,
    /// Output tokens.
    #[serde(rename = "out")]
    pub output: u64,
}

/// Usage figures returned to the caller after a generation.
///
/// Currency amounts are rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// The billing period.
    pub month: PeriodKey,
    /// Cumulative spend after this call.
    #[serde(rename = "spentUSD")]
    pub spent_usd: f64,
    /// Monthly cap.
    #[serde(rename = "budgetUSD")]
    pub budget_usd: f64,
    /// Cost of this call.
    #[serde(rename = "thisCallUSD")]
    pub this_call_usd: f64,
    /// Token counts of this call.
    pub tokens: TokenCounts,
}

impl UsageSummary {
    /// Build a display summary, rounding currency amounts.
    #[must_use]
    pub fn new(
        month: PeriodKey,
        spent_usd: f64,
        budget_usd: f64,
        this_call_usd: f64,
        tokens: TokenCounts,
    ) -> Self {
        Self {
            month,
            spent_usd: round_usd(spent_usd),
            budget_usd,
            this_call_usd: round_usd(this_call_usd),
            tokens,
        }
    }
}
