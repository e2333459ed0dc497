//! The result of a successful preview generation.

use serde::{Deserialize, Serialize};

use crate::candidate::KataCandidate;
use crate::request::{Difficulty, KataLength, Language};
use crate::usage::UsageSummary;

/// A validated candidate plus metadata about how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    /// The generated kata.
    pub candidate: KataCandidate,
    /// Resolved parameters and usage.
    pub meta: PreviewMeta,
}

/// Resolved parameters and usage for a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMeta {
    /// Language after defaults.
    pub language: Language,
    /// User-facing difficulty after defaults.
    pub difficulty: Difficulty,
    /// Length after defaults.
    pub length: KataLength,
    /// Estimated duration in minutes.
    pub est_minutes: u32,
    /// Spend figures for display.
    pub usage: UsageSummary,
}
