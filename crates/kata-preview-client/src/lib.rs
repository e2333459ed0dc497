//! Kata Preview Client SDK.
//!
//! This crate provides a client library for front ends and tools that
//! request kata previews and inspect the monthly preview budget.
//!
//! # Example
//!
//! ```no_run
//! use kata_preview_client::{accept_preview, GenerationRequest, KataPreviewClient, Language};
//!
//! # async fn example() -> Result<(), kata_preview_client::ClientError> {
//! let client = KataPreviewClient::new("http://kata-preview:8080")?;
//!
//! let preview = client
//!     .generate_preview(
//!         "caller-id-token",
//!         &GenerationRequest {
//!             influence: Some("debounce".to_string()),
//!             language: Some(Language::Typescript),
//!             ..GenerationRequest::default()
//!         },
//!     )
//!     .await?;
//!
//! println!(
//!     "{} (${} of ${} spent this month)",
//!     preview.candidate.title, preview.meta.usage.spent_usd, preview.meta.usage.budget_usd
//! );
//!
//! let kata = accept_preview(&preview, chrono::Utc::now());
//! println!("Added {} to the backlog", kata.id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{accept_preview, ClientOptions, KataPreviewClient};
pub use error::ClientError;
pub use types::*;
