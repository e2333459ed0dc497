//! OpenAI Chat Completions integration.
//!
//! The client sends one strict structured-output request per preview and
//! reports every failure as an [`UpstreamFailure`](kata_preview_core::UpstreamFailure)
//! so the generator can classify it.

mod client;
pub mod types;

pub use client::{OpenAiClient, OpenAiError};

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for kata generation.
pub const TEMPERATURE: f32 = 0.5;

/// Output token limit for kata generation.
pub const MAX_TOKENS: u32 = 1500;
