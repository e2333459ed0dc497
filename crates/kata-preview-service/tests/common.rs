//! Common test utilities for kata preview integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kata_preview_core::{CallerIdentity, FixedClock, PeriodKey, UsageDelta};
use kata_preview_service::{
    create_router, ApiError, AppState, OpenAiClient, ServiceConfig, TokenVerifier,
};
use kata_preview_store::{MemoryStore, UsageStore};

/// Accepts `test-token:<uid>` bearer tokens.
struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<CallerIdentity, ApiError> {
        token
            .strip_prefix("test-token:")
            .map(CallerIdentity::new)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Stand-in for the OpenAI API.
    pub openai: MockServer,
    /// The usage store behind the ledger.
    pub store: Arc<MemoryStore>,
    /// The clock used for period keys.
    pub clock: Arc<FixedClock>,
}

/// Mid-September 2025.
pub fn september() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 14, 12, 0, 0).unwrap()
}

impl TestHarness {
    /// Create a new test harness with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness after adjusting the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let openai = MockServer::start().await;

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            openai_base_url: openai.uri(),
            openai_api_key: Some("sk-test".into()),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(september()));
        let backend = OpenAiClient::new(&config.openai_base_url, config.openai_api_key.clone())
            .expect("Failed to build OpenAI client")
            .with_model(&config.openai_model);

        let state = AppState::with_parts(
            config,
            store.clone(),
            Arc::new(backend),
            Arc::new(StaticVerifier),
            clock.clone(),
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            openai,
            store,
            clock,
        }
    }

    /// Authorization header value for the default test user.
    pub fn user_auth(&self) -> HeaderValue {
        HeaderValue::from_static("Bearer test-token:user-1")
    }

    /// Authorization header value the verifier rejects.
    pub fn bogus_auth() -> HeaderValue {
        HeaderValue::from_static("Bearer forged")
    }

    /// Serve one successful completion with the given token usage.
    pub async fn mock_completion(&self, tokens_in: u64, tokens_out: u64) {
        self.mock_completion_content(&candidate_json().to_string(), tokens_in, tokens_out)
            .await;
    }

    /// Serve a completion whose content is `content`.
    pub async fn mock_completion_content(&self, content: &str, tokens_in: u64, tokens_out: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(completion_response(content, tokens_in, tokens_out))
            .mount(&self.openai)
            .await;
    }

    /// Serve successful completions that take `delay` to arrive.
    pub async fn mock_slow_completion(&self, tokens_in: u64, tokens_out: u64, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                completion_response(&candidate_json().to_string(), tokens_in, tokens_out)
                    .set_delay(delay),
            )
            .mount(&self.openai)
            .await;
    }

    /// Number of requests the provider stand-in has received.
    pub async fn provider_calls(&self) -> usize {
        self.openai
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Serve a provider error.
    pub async fn mock_error(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.openai)
            .await;
    }

    /// Fail the test if the provider is called at all.
    pub async fn forbid_provider_calls(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.openai)
            .await;
    }

    /// Record spend for the harness clock's current period.
    pub fn seed_spend(&self, cost_usd: f64) {
        self.store
            .increment_usage(
                &self.period(),
                &UsageDelta {
                    tokens_in: 0,
                    tokens_out: 0,
                    cost_usd,
                    at: september(),
                },
            )
            .expect("Failed to seed spend");
    }

    /// The current period according to the harness clock.
    pub fn period(&self) -> PeriodKey {
        PeriodKey::current(self.clock.as_ref())
    }

    /// Spend recorded for the current period.
    pub fn spent(&self) -> f64 {
        self.store
            .get_usage(&self.period())
            .expect("Failed to read usage")
            .spent_usd
    }
}

/// A candidate that passes validation.
pub fn candidate_json() -> Value {
    json!({
        "title": "Debounce It",
        "summary": "Implement a debounce helper.",
        "description": "Write debounce(fn, ms) that delays invocation until calls stop.",
        "steps": ["Read the tests", "Implement debounce", "Run the tests"],
        "tags": ["timers", "functions"],
        "starterCode": "export function debounce(fn, ms) {}",
        "tests": "test('debounce', () => {});",
        "solution": "export function debounce(fn, ms) { let t; return (...a) => { clearTimeout(t); t = setTimeout(() => fn(...a), ms); }; }",
        "hints": ["Use setTimeout", "Clear the previous timer", "Forward the latest arguments"],
        "acceptanceCriteria": ["Delays calls", "Uses latest args", "Cancels pending calls"]
    })
}

/// A chat-completions success body.
fn completion_response(content: &str, tokens_in: u64, tokens_out: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": tokens_in,
            "completion_tokens": tokens_out,
            "total_tokens": tokens_in + tokens_out
        }
    }))
}
