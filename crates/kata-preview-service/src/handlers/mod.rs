//! HTTP request handlers.

pub mod health;
pub mod previews;
pub mod usage;
