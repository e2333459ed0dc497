//! Application state.

use std::sync::Arc;

use tokio::sync::Semaphore;

use kata_preview_core::{Clock, SystemClock};
use kata_preview_store::{BudgetLedger, UsageStore};

use crate::auth::{JwksVerifier, TokenVerifier};
use crate::config::ServiceConfig;
use crate::generator::{CompletionBackend, PreviewGenerator};
use crate::openai::{OpenAiClient, OpenAiError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// Spend ledger over the usage store.
    pub ledger: BudgetLedger,

    /// Budget-gated preview generator.
    pub generator: Arc<PreviewGenerator>,

    /// ID-token verifier.
    pub verifier: Arc<dyn TokenVerifier>,

    /// Time source for period keys.
    pub clock: Arc<dyn Clock>,

    /// Generation slots. A permit is held by the generation task, not the
    /// HTTP request, so it stays taken until the provider call finishes.
    pub preview_slots: Arc<Semaphore>,
}

impl AppState {
    /// Create the production state: OpenAI backend, JWKS verifier, system
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenAI HTTP client cannot be built.
    pub fn new(store: Arc<dyn UsageStore>, config: ServiceConfig) -> Result<Self, OpenAiError> {
        let openai = OpenAiClient::new(&config.openai_base_url, config.openai_api_key.clone())?
            .with_model(&config.openai_model);

        if openai.has_api_key() {
            tracing::info!(
                base_url = %config.openai_base_url,
                model = %openai.model(),
                "OpenAI integration enabled"
            );
        } else {
            tracing::warn!("OpenAI API key not configured - previews will fail");
        }

        let verifier = JwksVerifier::new(
            &config.auth_jwks_url,
            &config.auth_issuer,
            &config.auth_audience,
        );

        Ok(Self::with_parts(
            config,
            store,
            Arc::new(openai),
            Arc::new(verifier),
            Arc::new(SystemClock),
        ))
    }

    /// Assemble state from explicit parts.
    #[must_use]
    pub fn with_parts(
        config: ServiceConfig,
        store: Arc<dyn UsageStore>,
        backend: Arc<dyn CompletionBackend>,
        verifier: Arc<dyn TokenVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = BudgetLedger::new(store);
        let preview_slots = Arc::new(Semaphore::new(config.max_concurrent_previews.max(1)));
        let generator = PreviewGenerator::new(
            ledger.clone(),
            backend,
            Arc::clone(&clock),
            config.budget,
        );

        Self {
            config,
            ledger,
            generator: Arc::new(generator),
            verifier,
            clock,
            preview_slots,
        }
    }
}
