//! Usage reporting handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use kata_preview_core::{round_usd, Decision, PeriodKey, UsageRecord};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Default number of periods returned by the history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 12;

/// Maximum number of periods returned by the history endpoint.
const MAX_HISTORY_LIMIT: usize = 120;

/// Spend for the current period.
#[derive(Debug, Serialize, Deserialize)]
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
    /// Cap minus spend, floored at zero.
    #[serde(rename = "remainingUSD")]
    pub remaining_usd: f64,
    /// Whether the next call would be admitted.
    pub decision: Decision,
}

/// Query parameters for usage history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of periods to return.
    pub limit: Option<usize>,
}

/// Recorded periods, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Usage records.
    pub periods: Vec<UsageRecord>,
}

/// Get spend for the current period.
///
/// GET /v1/usage
pub async fn current_usage(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UsageResponse>, ApiError> {
    let period = PeriodKey::current(state.clock.as_ref());
    let record = state.ledger.usage(&period)?;
    let policy = state.generator.policy();

    tracing::debug!(uid = %auth.identity.uid, period = %period, "Usage requested");

    Ok(Json(UsageResponse {
        month: period,
        call_count: record.call_count,
        tokens_in: record.tokens_in,
        tokens_out: record.tokens_out,
        spent_usd: round_usd(record.spent_usd),
        budget_usd: policy.monthly_cap_usd,
        remaining_usd: round_usd((policy.monthly_cap_usd - record.spent_usd).max(0.0)),
        decision: policy.evaluate(record.spent_usd),
    }))
}

/// List recorded periods.
///
/// GET /v1/usage/history?limit=N
pub async fn usage_history(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let periods = state.ledger.history(limit)?;

    Ok(Json(HistoryResponse { periods }))
}
