//! Key encoding for usage records.
//!
//! Period keys are stored as their ASCII `YYYY-MM` form, which sorts
//! chronologically under bytewise comparison.

use kata_preview_core::PeriodKey;

use crate::error::{Result, StoreError};

/// Encode a period as a storage key.
#[must_use]
pub fn usage_key(period: &PeriodKey) -> Vec<u8> {
    period.as_str().as_bytes().to_vec()
}

/// Decode a storage key back into a period.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the key is not a valid period.
pub fn period_from_key(key: &[u8]) -> Result<PeriodKey> {
    std::str::from_utf8(key)
        .map_err(|e| StoreError::Serialization(e.to_string()))?
        .parse()
        .map_err(|e: kata_preview_core::PeriodError| StoreError::Serialization(e.to_string()))
}
