//! OpenAI API client implementation.

use async_trait::async_trait;
use reqwest::Client;

use kata_preview_core::{PreviewPrompt, UpstreamFailure};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat};
use super::{DEFAULT_MODEL, MAX_TOKENS, TEMPERATURE};
use crate::generator::{Completion, CompletionBackend};

/// Error type for OpenAI operations.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// OpenAI API returned an error.
    #[error("OpenAI API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// No API key is configured.
    #[error("OpenAI API key is not configured")]
    MissingApiKey,
}

impl From<OpenAiError> for UpstreamFailure {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::Api {
                status,
                message,
                code,
            } => Self {
                status: Some(status),
                message,
                code,
            },
            OpenAiError::Http(e) => Self {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
                code: None,
            },
            OpenAiError::MissingApiKey => Self::transport(OpenAiError::MissingApiKey.to_string()),
        }
    }
}

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API URL (e.g., `"https://api.openai.com"`)
    /// * `api_key` - API key; calls fail without contacting the API when `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, OpenAiError> {
        // No request timeout: a call that has been issued runs to completion.
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Use a different chat model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the structured-output request for a prompt.
    #[must_use]
    pub fn build_request(&self, prompt: &PreviewPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            response_format: ResponseFormat::JsonSchema {
                json_schema: prompt.schema.clone(),
            },
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// Send a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// missing API key.
    pub async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        let api_key = self.api_key.as_ref().ok_or(OpenAiError::MissingApiKey)?;
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, OpenAiError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let failure = UpstreamFailure::from_error_body(status.as_u16(), &body);
        let message = if failure.message.is_empty() {
            format!("HTTP {status}")
        } else {
            failure.message
        };

        Err(OpenAiError::Api {
            status: status.as_u16(),
            message,
            code: failure.code,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, prompt: &PreviewPrompt) -> Result<Completion, UpstreamFailure> {
        let request = self.build_request(prompt);
        let response = self.create_chat_completion(&request).await?;

        if let Some(id) = &response.id {
            tracing::debug!(completion_id = %id, model = ?response.model, "OpenAI completion received");
        }

        let usage = response.usage.unwrap_or_default();
        let choice = response.choices.into_iter().next().unwrap_or_default();

        Ok(Completion {
            content: choice.message.content,
            refusal: choice.message.refusal,
            finish_reason: choice.finish_reason,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}
