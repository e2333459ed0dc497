//! Core types and utilities for the kata preview service.
//!
//! This crate provides the foundational types used throughout the workspace:
//!
//! - **Periods**: `PeriodKey`, `Clock`, `SystemClock`, `FixedClock`
//! - **Usage**: `UsageRecord`, `UsageDelta`, `UsageSummary`
//! - **Budget**: `BudgetPolicy`, `TokenPricing`, `Decision`
//! - **Requests**: `GenerationRequest`, `Language`, `Difficulty`, `KataLength`
//! - **Candidates**: `KataCandidate`, `PreviewPrompt`, `PreviewResult`
//! - **Errors**: `PreviewError`, `ErrorKind`, `UpstreamFailure`
//! - **Katas**: `KataRecord`, `KataStatus`
//!
//! # Budget Model
//!
//! Spend is tracked per calendar month (UTC) in US dollars. A call is only
//! admitted while the current spend plus a worst-case single-call estimate
//! stays within the monthly cap; the exact cost is committed after the
//! provider reports token usage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod budget;
pub mod candidate;
pub mod clock;
pub mod error;
pub mod identity;
pub mod kata;
pub mod period;
pub mod preview;
pub mod prompt;
pub mod request;
pub mod upstream;
pub mod usage;

pub use budget::{
    round_usd, BudgetPolicy, Decision, TokenPricing, DEFAULT_MONTHLY_CAP_USD,
    DEFAULT_PRICE_IN_USD_PER_TOKEN, DEFAULT_PRICE_OUT_USD_PER_TOKEN,
    DEFAULT_WORST_CASE_CALL_USD,
};
pub use candidate::{kata_json_schema, KataCandidate, SCHEMA_NAME};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BudgetDenial, ErrorKind, PreviewError, Result};
pub use identity::CallerIdentity;
pub use kata::{KataId, KataRecord, KataStatus};
pub use period::{PeriodError, PeriodKey};
pub use preview::{PreviewMeta, PreviewResult};
pub use prompt::PreviewPrompt;
pub use request::{
    Difficulty, GenerationRequest, KataLength, Language, PromptDifficulty, ResolvedRequest,
};
pub use upstream::{translate_upstream, UpstreamFailure};
pub use usage::{TokenCounts, UsageDelta, UsageRecord, UsageSummary};
