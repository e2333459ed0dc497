//! HTTP API service for budget-gated kata previews.
//!
//! This crate provides the REST API for generating kata previews with a
//! language model while keeping provider spend under a monthly cap.
//!
//! # Endpoints
//!
//! ## Previews
//! - `POST /v1/previews` - Generate a kata preview (ID token required)
//!
//! ## Usage
//! - `GET /v1/usage` - Current period spend and admission state
//! - `GET /v1/usage/history` - Recorded periods
//!
//! ## Health
//! - `GET /health` - Service health

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod openai;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, JwksVerifier, TokenVerifier};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use generator::{Completion, CompletionBackend, PreviewGenerator};
pub use openai::{OpenAiClient, OpenAiError};
pub use routes::create_router;
pub use state::AppState;
