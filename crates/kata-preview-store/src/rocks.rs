//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `UsageStore` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use kata_preview_core::{PeriodKey, UsageDelta, UsageRecord};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::UsageStore;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes increments so concurrent commits to one period never lose
    /// an update.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl UsageStore for RocksStore {
    fn get_usage(&self, period: &PeriodKey) -> Result<UsageRecord> {
        let cf = self.cf(cf::USAGE_PERIODS)?;
        let key = keys::usage_key(period);

        Ok(self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()?
            .unwrap_or_else(|| UsageRecord::empty(period.clone())))
    }

    fn increment_usage(&self, period: &PeriodKey, delta: &UsageDelta) -> Result<UsageRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Database("usage write lock poisoned".into()))?;

        let mut record = self.get_usage(period)?;
        record.apply(delta);

        let cf = self.cf(cf::USAGE_PERIODS)?;
        let key = keys::usage_key(period);
        let value = Self::serialize(&record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, &key, &value);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            period = %period,
            call_count = record.call_count,
            spent_usd = record.spent_usd,
            "Usage incremented"
        );

        Ok(record)
    }

    fn list_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let cf = self.cf(cf::USAGE_PERIODS)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            if records.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let record: UsageRecord = Self::deserialize(&value)?;
            if record.period != keys::period_from_key(&key)? {
                return Err(StoreError::Serialization(format!(
                    "usage record for {} stored under a different key",
                    record.period
                )));
            }
            records.push(record);
        }

        Ok(records)
    }
}
