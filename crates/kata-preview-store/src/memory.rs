//! In-memory storage implementation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use kata_preview_core::{PeriodKey, UsageDelta, UsageRecord};

use crate::error::{Result, StoreError};
use crate::UsageStore;

/// Mutex-guarded in-process storage.
///
/// Used by tests and by deployments built without a persistent backend.
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<PeriodKey, UsageRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<PeriodKey, UsageRecord>>> {
        self.records
            .lock()
            .map_err(|_| StoreError::Database("usage map lock poisoned".into()))
    }
}

impl UsageStore for MemoryStore {
    fn get_usage(&self, period: &PeriodKey) -> Result<UsageRecord> {
        Ok(self
            .records()?
            .get(period)
            .cloned()
            .unwrap_or_else(|| UsageRecord::empty(period.clone())))
    }

    fn increment_usage(&self, period: &PeriodKey, delta: &UsageDelta) -> Result<UsageRecord> {
        let mut records = self.records()?;
        let record = records
            .entry(period.clone())
            .or_insert_with(|| UsageRecord::empty(period.clone()));
        record.apply(delta);
        Ok(record.clone())
    }

    fn list_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        Ok(self
            .records()?
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
