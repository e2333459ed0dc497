//! Billing period keys.
//!
//! Spend is partitioned by calendar month in UTC. The key format is
//! `YYYY-MM`, so lexicographic order matches chronological order and a new
//! month starts with an empty ledger without any rollover step.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Errors produced when parsing a period key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// The string is not of the form `YYYY-MM`.
    #[error("invalid period key: {0}")]
    Malformed(String),
}

/// A calendar-month identifier, e.g. `2025-09`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Derive the period containing `at`.
    ///
    /// Keys cover `0000-01` through `9999-12`; instants outside that range
    /// saturate to the nearest end so every derived key parses back.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let (year, month) = match at.year() {
            y if y > 9999 => (9999, 12),
            y if y < 0 => (0, 1),
            y => (y, at.month()),
        };
        Self(format!("{year:04}-{month:02}"))
    }

    /// Derive the period containing the clock's current instant.
    #[must_use]
    pub fn current(clock: &dyn Clock) -> Self {
        Self::from_datetime(clock.now())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PeriodKey {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PeriodError::Malformed(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(malformed());
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let month: u32 = month.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) {
            return Err(malformed());
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
