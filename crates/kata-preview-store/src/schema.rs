//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Usage records, keyed by period (`YYYY-MM`).
    pub const USAGE_PERIODS: &str = "usage_periods";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::USAGE_PERIODS]
}
