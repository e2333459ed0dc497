//! Usage storage and budget ledger for the kata preview service.
//!
//! This crate provides persistent per-period usage counters and the
//! [`BudgetLedger`] that gates and accounts for provider spend.
//!
//! # Architecture
//!
//! - [`UsageStore`]: get-or-default reads and atomic increments of
//!   [`UsageRecord`]s keyed by [`PeriodKey`]
//! - [`MemoryStore`]: in-process backend for tests and ephemeral deployments
//! - `RocksStore`: `RocksDB` backend (feature `rocksdb-backend`)
//! - [`BudgetLedger`]: admission and commit over an injected store handle
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use kata_preview_core::TokenPricing;
//! use kata_preview_store::{BudgetLedger, MemoryStore};
//!
//! let ledger = BudgetLedger::new(Arc::new(MemoryStore::new()));
//! let period = BudgetLedger::current_period_key(Utc::now());
//!
//! let admission = ledger.admit(&period, 0.50, 0.005).unwrap();
//! assert!(admission.decision.is_allowed());
//!
//! let outcome = ledger
//!     .commit(&period, 1000, 500, &TokenPricing::default(), Utc::now())
//!     .unwrap();
//! assert!((outcome.total_usd - 0.0018).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod ledger;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use ledger::{Admission, BudgetLedger, CommitOutcome};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use kata_preview_core::{PeriodKey, UsageDelta, UsageRecord};

/// The storage trait for per-period usage counters.
///
/// Implementations must make [`UsageStore::increment_usage`] atomic with
/// respect to concurrent increments of the same period.
pub trait UsageStore: Send + Sync {
    /// Get the usage record for a period.
    ///
    /// A period that was never written reads as [`UsageRecord::empty`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_usage(&self, period: &PeriodKey) -> Result<UsageRecord>;

    /// Apply one successful call to a period's record, creating it if needed.
    ///
    /// Returns the record after the increment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. No partial update
    /// is visible on failure.
    fn increment_usage(&self, period: &PeriodKey, delta: &UsageDelta) -> Result<UsageRecord>;

    /// List recorded periods, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage(&self, limit: usize) -> Result<Vec<UsageRecord>>;
}
