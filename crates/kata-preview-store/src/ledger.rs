//! Budget ledger: admission and commit of provider spend.
//!
//! The ledger is the only writer of usage records. Admission reads a
//! snapshot of the period's spend; commit applies the exact cost of a
//! completed call as a single store-level increment.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use kata_preview_core::{Decision, PeriodKey, TokenPricing, UsageDelta, UsageRecord};

use crate::error::{Result, StoreError};
use crate::UsageStore;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// Whether the call may proceed.
    pub decision: Decision,
    /// The spend snapshot the decision was based on.
    pub spent_usd: f64,
}

/// Result of committing one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// Exact cost of the committed call.
    pub cost_usd: f64,
    /// Cumulative spend for the period after the commit.
    pub total_usd: f64,
    /// The full record after the commit.
    pub record: UsageRecord,
}

/// Tracks spend per billing period against a store handle.
#[derive(Clone)]
pub struct BudgetLedger {
    store: Arc<dyn UsageStore>,
}

impl BudgetLedger {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// The period key for an instant.
    #[must_use]
    pub fn current_period_key(now: DateTime<Utc>) -> PeriodKey {
        PeriodKey::from_datetime(now)
    }

    /// Cumulative spend for a period; zero if nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store read fails.
    pub fn get_spent(&self, period: &PeriodKey) -> Result<f64> {
        Ok(self.store.get_usage(period)?.spent_usd)
    }

    /// The full usage record for a period.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn usage(&self, period: &PeriodKey) -> Result<UsageRecord> {
        self.store.get_usage(period)
    }

    /// Recorded periods, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn history(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        self.store.list_usage(limit)
    }

    /// Decide whether a call may proceed in `period`.
    ///
    /// The classification itself cannot fail; an error means the spend
    /// could not be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn admit(
        &self,
        period: &PeriodKey,
        hard_cap_usd: f64,
        worst_case_call_usd: f64,
    ) -> Result<Admission> {
        let spent_usd = self.get_spent(period)?;
        let decision = Decision::evaluate(spent_usd, hard_cap_usd, worst_case_call_usd);

        tracing::debug!(
            period = %period,
            spent_usd,
            hard_cap_usd,
            worst_case_call_usd,
            ?decision,
            "Budget admission evaluated"
        );

        Ok(Admission {
            decision,
            spent_usd,
        })
    }

    /// Record a completed call and return its cost and the new total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAmount`] if the priced cost is negative
    /// or not finite, and a database error if the store write fails. In
    /// both cases the call's cost is not recorded.
    pub fn commit(
        &self,
        period: &PeriodKey,
        tokens_in: u64,
        tokens_out: u64,
        pricing: &TokenPricing,
        at: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        let cost_usd = pricing.cost(tokens_in, tokens_out);
        if !cost_usd.is_finite() || cost_usd < 0.0 {
            return Err(StoreError::InvalidAmount(format!(
                "cost {cost_usd} for {tokens_in} input / {tokens_out} output tokens"
            )));
        }

        let delta = UsageDelta {
            tokens_in,
            tokens_out,
            cost_usd,
            at,
        };

        let record = self.store.increment_usage(period, &delta)?;

        tracing::info!(
            period = %period,
            tokens_in,
            tokens_out,
            cost_usd,
            total_usd = record.spent_usd,
            call_count = record.call_count,
            "Usage committed"
        );

        Ok(CommitOutcome {
            cost_usd,
            total_usd: record.spent_usd,
            record,
        })
    }
}
