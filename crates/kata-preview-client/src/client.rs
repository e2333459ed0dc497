//! Kata preview HTTP client implementation.

use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, GenerationRequest, HistoryResponse, KataRecord, PreviewResult,
    UsageResponse,
};

/// Kata preview API client.
///
/// Every call takes the caller's ID token; the service decides identity.
#[derive(Debug, Clone)]
pub struct KataPreviewClient {
    client: Client,
    base_url: String,
}

impl KataPreviewClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://kata-preview:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Generate a kata preview.
    ///
    /// # Errors
    ///
    /// Returns a typed error for each service failure class, or an HTTP
    /// error if the request fails.
    pub async fn generate_preview(
        &self,
        id_token: &str,
        request: &GenerationRequest,
    ) -> Result<PreviewResult, ClientError> {
        let url = format!("{}/v1/previews", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {id_token}"))
            .json(request)
            .send()
            .await?;

        let result: PreviewResult = self.handle_response(response).await?;

        tracing::debug!(
            title = %result.candidate.title,
            spent_usd = result.meta.usage.spent_usd,
            "Preview generated"
        );

        Ok(result)
    }

    /// Spend for the current period.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn current_usage(&self, id_token: &str) -> Result<UsageResponse, ClientError> {
        let url = format!("{}/v1/usage", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {id_token}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Recorded periods, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn usage_history(
        &self,
        id_token: &str,
        limit: Option<usize>,
    ) -> Result<HistoryResponse, ClientError> {
        let url = format!("{}/v1/usage/history", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {id_token}"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;
                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_f64)
                        .unwrap_or(0.0)
                };

                match code {
                    "unauthenticated" => Err(ClientError::Unauthenticated { message }),
                    "budget_exhausted" => Err(ClientError::BudgetExhausted {
                        spent_usd: detail("spentUSD"),
                        budget_usd: detail("budgetUSD"),
                        message,
                    }),
                    "upstream_quota_exceeded" => {
                        Err(ClientError::UpstreamQuotaExceeded { message })
                    }
                    "upstream_rate_limited" => Err(ClientError::UpstreamRateLimited { message }),
                    "upstream_malformed_response" => {
                        Err(ClientError::UpstreamMalformedResponse { message })
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Turn an accepted preview into a backlog kata record.
#[must_use]
pub fn accept_preview(preview: &PreviewResult, now: DateTime<Utc>) -> KataRecord {
    KataRecord::from_preview(
        &preview.candidate,
        Some(preview.meta.language),
        Some(preview.meta.difficulty),
        now,
    )
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 120).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, Language};
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn preview_body() -> serde_json::Value {
        json!({
            "candidate": {
                "title": "Debounce It",
                "summary": "Implement a debounce helper.",
                "description": "Write debounce(fn, ms).",
                "steps": ["Read", "Write", "Test"],
                "tags": ["Timers", "timers", "functions"],
                "starterCode": "export function debounce() {}",
                "tests": "test('debounce', () => {});",
                "solution": "export function debounce(fn, ms) {}",
                "hints": ["One", "Two", "Three"],
                "acceptanceCriteria": ["Delays calls", "Uses latest args", "Cancels pending"]
            },
            "meta": {
                "language": "typescript",
                "difficulty": "easy",
                "length": "Snack",
                "estMinutes": 15,
                "usage": {
                    "month": "2025-09",
                    "spentUSD": 0.0018,
                    "budgetUSD": 0.5,
                    "thisCallUSD": 0.0018,
                    "tokens": { "in": 1000, "out": 500 }
                }
            }
        })
    }

    fn error_body(code: &str, message: &str, details: serde_json::Value) -> serde_json::Value {
        json!({ "error": { "code": code, "message": message, "details": details } })
    }

    #[test]
    fn client_creation() {
        let client = KataPreviewClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = KataPreviewClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn generate_preview_sends_token_and_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/previews"))
            .and(header("authorization", "Bearer id-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(preview_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();
        let result = client
            .generate_preview("id-token", &GenerationRequest::default())
            .await
            .unwrap();

        assert_eq!(result.candidate.title, "Debounce It");
        assert_eq!(result.meta.language, Language::Typescript);
        assert_eq!(result.meta.difficulty, Difficulty::Easy);
        assert_eq!(result.meta.est_minutes, 15);
        assert_eq!(result.meta.usage.tokens.input, 1000);
    }

    #[tokio::test]
    async fn budget_exhaustion_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/previews"))
            .respond_with(ResponseTemplate::new(429).set_body_json(error_body(
                "budget_exhausted",
                "Monthly preview budget reached ($0.50 / $0.50).",
                json!({ "spentUSD": 0.5, "budgetUSD": 0.5, "nearCap": false }),
            )))
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();
        let err = client
            .generate_preview("id-token", &GenerationRequest::default())
            .await
            .unwrap_err();

        match err {
            ClientError::BudgetExhausted {
                spent_usd,
                budget_usd,
                message,
            } => {
                assert!((spent_usd - 0.5).abs() < f64::EPSILON);
                assert!((budget_usd - 0.5).abs() < f64::EPSILON);
                assert!(message.starts_with("Monthly preview budget reached"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_is_retryable_and_quota_is_not() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/previews"))
            .and(header("authorization", "Bearer limited"))
            .respond_with(ResponseTemplate::new(503).set_body_json(error_body(
                "upstream_rate_limited",
                "OpenAI rate limit hit. Please retry in a moment.",
                json!({ "retryable": true }),
            )))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/previews"))
            .and(header("authorization", "Bearer broke"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "code": "upstream_quota_exceeded", "message": "quota" }
            })))
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();

        let limited = client
            .generate_preview("limited", &GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(limited, ClientError::UpstreamRateLimited { .. }));
        assert!(limited.is_retryable());

        let broke = client
            .generate_preview("broke", &GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(broke, ClientError::UpstreamQuotaExceeded { .. }));
        assert!(!broke.is_retryable());
    }

    #[tokio::test]
    async fn unknown_error_body_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/usage"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();
        let err = client.current_usage("id-token").await.unwrap_err();

        match err {
            ClientError::Api { code, status, .. } => {
                assert_eq!(code, "unknown");
                assert_eq!(status, 502);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_success_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/usage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();
        let err = client.current_usage("id-token").await.unwrap_err();

        assert!(matches!(err, ClientError::Serialization(_)));
        assert!(err.kind().is_none());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn usage_history_passes_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/usage/history"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "periods": [{
                    "period": "2025-09",
                    "callCount": 2,
                    "tokensIn": 2000,
                    "tokensOut": 1000,
                    "spentUSD": 0.0036,
                    "updatedAt": null
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = KataPreviewClient::new(server.uri()).unwrap();
        let history = client.usage_history("id-token", Some(3)).await.unwrap();

        assert_eq!(history.periods.len(), 1);
        assert_eq!(history.periods[0].period.as_str(), "2025-09");
        assert_eq!(history.periods[0].call_count, 2);
    }

    #[test]
    fn accepted_preview_becomes_backlog_record() {
        let preview: PreviewResult = serde_json::from_value(preview_body()).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 9, 14, 12, 0, 0).unwrap();

        let record = accept_preview(&preview, now);

        assert_eq!(record.title, "Debounce It");
        assert_eq!(
            record.description.as_deref(),
            Some("Implement a debounce helper.")
        );
        assert_eq!(record.tags, vec!["timers".to_string(), "functions".to_string()]);
        assert!(record.requirements.unwrap_or_default().contains("```ts"));
        assert_eq!(record.created_at, now);
    }
}
