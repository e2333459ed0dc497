//! Budget policy and admission decisions.
//!
//! The policy is fixed per deployment: a monthly cap in USD, per-token
//! prices for input and output, and a conservative worst-case estimate of a
//! single call used for admission before the real cost is known.

use serde::{Deserialize, Serialize};

/// Default monthly cap in USD.
pub const DEFAULT_MONTHLY_CAP_USD: f64 = 0.5;

/// Default input price in USD per token ($0.60 per 1M tokens).
pub const DEFAULT_PRICE_IN_USD_PER_TOKEN: f64 = 0.6 / 1_000_000.0;

/// Default output price in USD per token ($2.40 per 1M tokens).
pub const DEFAULT_PRICE_OUT_USD_PER_TOKEN: f64 = 2.4 / 1_000_000.0;

/// Default worst-case cost of a single call in USD.
pub const DEFAULT_WORST_CASE_CALL_USD: f64 = 0.005;

/// Decimal places used when displaying currency amounts.
const DISPLAY_DECIMALS: i32 = 4;

/// Per-token prices in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPricing {
    /// Price of one input (prompt) token.
    pub input_usd_per_token: f64,
    /// Price of one output (completion) token.
    pub output_usd_per_token: f64,
}

impl TokenPricing {
    /// Build pricing from prices quoted per million tokens.
    #[must_use]
    pub fn per_million(input_usd: f64, output_usd: f64) -> Self {
        Self {
            input_usd_per_token: input_usd / 1_000_000.0,
            output_usd_per_token: output_usd / 1_000_000.0,
        }
    }

    /// Exact cost of a call with the given token counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        tokens_in as f64 * self.input_usd_per_token + tokens_out as f64 * self.output_usd_per_token
    }
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self {
            input_usd_per_token: DEFAULT_PRICE_IN_USD_PER_TOKEN,
            output_usd_per_token: DEFAULT_PRICE_OUT_USD_PER_TOKEN,
        }
    }
}

/// Spend limits applied to preview generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetPolicy {
    /// Hard monthly cap in USD.
    pub monthly_cap_usd: f64,
    /// Conservative upper bound on the cost of one call.
    ///
    /// Tunable: a larger value rejects earlier near the cap, a smaller one
    /// allows a larger overshoot when calls race through admission.
    pub worst_case_call_usd: f64,
    /// Token prices used to compute the exact cost after a call.
    pub pricing: TokenPricing,
}

impl BudgetPolicy {
    /// Classify a spend amount against this policy.
    #[must_use]
    pub fn evaluate(&self, spent_usd: f64) -> Decision {
        Decision::evaluate(spent_usd, self.monthly_cap_usd, self.worst_case_call_usd)
    }
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            monthly_cap_usd: DEFAULT_MONTHLY_CAP_USD,
            worst_case_call_usd: DEFAULT_WORST_CASE_CALL_USD,
            pricing: TokenPricing::default(),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The call may proceed.
    Allow,
    /// Spend is already at or beyond the cap.
    DenyOverCap,
    /// Spend is under the cap, but a worst-case call could exceed it.
    DenyNearCap,
}

impl Decision {
    /// Classify `spent_usd` against `cap_usd`, reserving `worst_case_usd`
    /// for the call being admitted.
    #[must_use]
    pub fn evaluate(spent_usd: f64, cap_usd: f64, worst_case_usd: f64) -> Self {
        if spent_usd >= cap_usd {
            Self::DenyOverCap
        } else if spent_usd + worst_case_usd > cap_usd {
            Self::DenyNearCap
        } else {
            Self::Allow
        }
    }

    /// Whether the call may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Round a USD amount for display. Stored values keep full precision.
#[must_use]
pub fn round_usd(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}
