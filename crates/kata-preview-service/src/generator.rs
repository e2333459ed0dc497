//! Budget-gated preview generation.
//!
//! One call runs: identity check, budget admission, prompt build, a single
//! provider call, candidate validation, and finally the usage commit. Every
//! rejection before the commit leaves the ledger untouched.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use kata_preview_core::{
    translate_upstream, BudgetDenial, BudgetPolicy, CallerIdentity, Clock, Decision,
    GenerationRequest, KataCandidate, PeriodKey, PreviewError, PreviewMeta, PreviewPrompt,
    PreviewResult, ResolvedRequest, TokenCounts, UpstreamFailure, UsageSummary,
};
use kata_preview_store::BudgetLedger;

/// Raw output of one provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// The structured-output text, if any.
    pub content: Option<String>,
    /// Refusal text when the model declined to answer.
    pub refusal: Option<String>,
    /// Why generation stopped (`stop`, `length`, ...).
    pub finish_reason: Option<String>,
    /// Reported input tokens.
    pub prompt_tokens: Option<u64>,
    /// Reported output tokens.
    pub completion_tokens: Option<u64>,
}

/// A language-model backend able to answer one structured prompt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run a single completion. Implementations must not retry.
    async fn complete(&self, prompt: &PreviewPrompt) -> Result<Completion, UpstreamFailure>;
}

/// Generates kata previews under the monthly budget.
#[derive(Clone)]
pub struct PreviewGenerator {
    ledger: BudgetLedger,
    backend: Arc<dyn CompletionBackend>,
    clock: Arc<dyn Clock>,
    policy: BudgetPolicy,
}

impl PreviewGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(
        ledger: BudgetLedger,
        backend: Arc<dyn CompletionBackend>,
        clock: Arc<dyn Clock>,
        policy: BudgetPolicy,
    ) -> Self {
        Self {
            ledger,
            backend,
            clock,
            policy,
        }
    }

    /// The budget policy in force.
    #[must_use]
    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Generate one preview for `caller`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when `caller` is absent or blank; nothing else runs.
    /// - `BudgetExhausted` when admission refuses; the provider is not called.
    /// - `UpstreamQuotaExceeded`, `UpstreamRateLimited` or `InternalUnknown`
    ///   when the provider call fails.
    /// - `UpstreamMalformedResponse` when the output fails to validate.
    ///
    /// Spend is recorded only on success.
    pub async fn generate_preview(
        &self,
        request: &GenerationRequest,
        caller: Option<&CallerIdentity>,
    ) -> Result<PreviewResult, PreviewError> {
        let Some(caller) = caller.filter(|c| c.is_authenticated()) else {
            tracing::warn!("preview:error unauthenticated caller");
            return Err(PreviewError::Unauthenticated);
        };

        let request_id = Uuid::new_v4();
        let resolved = request.resolve();

        tracing::info!(
            %request_id,
            uid = %caller.uid,
            has_influence = resolved.influence.is_some(),
            language = resolved.language.as_str(),
            difficulty = resolved.prompt_difficulty.as_str(),
            est_minutes = resolved.est_minutes,
            "preview:start"
        );

        match self.run(request_id, &resolved).await {
            Ok(result) => {
                tracing::info!(
                    %request_id,
                    uid = %caller.uid,
                    title = %result.candidate.title,
                    this_call_usd = result.meta.usage.this_call_usd,
                    spent_usd = result.meta.usage.spent_usd,
                    "preview:ok"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(
                    %request_id,
                    uid = %caller.uid,
                    code = err.kind().code(),
                    error = %err,
                    "preview:error"
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request_id: Uuid,
        resolved: &ResolvedRequest,
    ) -> Result<PreviewResult, PreviewError> {
        let period = PeriodKey::current(self.clock.as_ref());

        let admission = self
            .ledger
            .admit(
                &period,
                self.policy.monthly_cap_usd,
                self.policy.worst_case_call_usd,
            )
            .map_err(|e| PreviewError::InternalUnknown(format!("failed to read usage: {e}")))?;

        let denial = match admission.decision {
            Decision::Allow => None,
            Decision::DenyOverCap => Some(BudgetDenial::OverCap),
            Decision::DenyNearCap => Some(BudgetDenial::NearCap),
        };
        if let Some(denial) = denial {
            return Err(PreviewError::BudgetExhausted {
                denial,
                spent_usd: admission.spent_usd,
                budget_usd: self.policy.monthly_cap_usd,
            });
        }

        let prompt = PreviewPrompt::build(resolved);

        let completion = self.backend.complete(&prompt).await.map_err(|failure| {
            tracing::warn!(
                %request_id,
                status = ?failure.status,
                code = ?failure.code,
                message = %failure.message,
                "Provider call failed"
            );
            translate_upstream(&failure)
        })?;

        if let Some(refusal) = &completion.refusal {
            tracing::warn!(%request_id, refusal = %refusal, "Model refused the prompt");
            return Err(PreviewError::UpstreamMalformedResponse(format!(
                "model refused: {refusal}"
            )));
        }

        let candidate = KataCandidate::parse(completion.content.as_deref().unwrap_or("{}"))
            .map_err(|e| {
                tracing::warn!(
                    %request_id,
                    finish_reason = ?completion.finish_reason,
                    has_content = completion.content.is_some(),
                    error = %e,
                    "Model output failed validation"
                );
                e
            })?;

        let tokens = TokenCounts {
            input: completion.prompt_tokens.unwrap_or(0),
            output: completion.completion_tokens.unwrap_or(0),
        };

        let outcome = self
            .ledger
            .commit(
                &period,
                tokens.input,
                tokens.output,
                &self.policy.pricing,
                self.clock.now(),
            )
            .map_err(|e| {
                tracing::error!(
                    %request_id,
                    period = %period,
                    tokens_in = tokens.input,
                    tokens_out = tokens.output,
                    lost_cost_usd = self.policy.pricing.cost(tokens.input, tokens.output),
                    error = %e,
                    "Failed to record preview usage"
                );
                PreviewError::InternalUnknown("Failed to record preview usage.".to_string())
            })?;

        Ok(PreviewResult {
            candidate,
            meta: PreviewMeta {
                language: resolved.language,
                difficulty: resolved.difficulty,
                length: resolved.length,
                est_minutes: resolved.est_minutes,
                usage: UsageSummary::new(
                    period,
                    outcome.total_usd,
                    self.policy.monthly_cap_usd,
                    outcome.cost_usd,
                    tokens,
                ),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use kata_preview_core::{
        Difficulty, FixedClock, KataLength, Language, UsageDelta, UsageRecord,
    };
    use kata_preview_store::{MemoryStore, StoreError, UsageStore};
    use serde_json::json;

    fn candidate_json() -> String {
        json!({
            "title": "Debounce It",
            "summary": "Implement a debounce helper.",
            "description": "Write debounce(fn, ms) that delays invocation.",
            "steps": ["Read the brief", "Write debounce", "Run tests"],
            "tags": ["timers", "functions"],
            "starterCode": "export function debounce() {}",
            "tests": "test('debounce', () => {});",
            "solution": "export function debounce(fn, ms) { /* ... */ }",
            "hints": ["Use setTimeout", "Clear the timer", "Keep the last args"],
            "acceptanceCriteria": ["Delays calls", "Uses latest args", "Cancels pending calls"]
        })
        .to_string()
    }

    fn ok_completion(tokens_in: u64, tokens_out: u64) -> Result<Completion, UpstreamFailure> {
        Ok(Completion {
            content: Some(candidate_json()),
            prompt_tokens: Some(tokens_in),
            completion_tokens: Some(tokens_out),
            ..Completion::default()
        })
    }

    /// Scripted backend that records the prompts it receives.
    #[derive(Default)]
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<Completion, UpstreamFailure>>>,
        prompts: Mutex<Vec<PreviewPrompt>>,
    }

    impl ScriptedBackend {
        fn with(responses: Vec<Result<Completion, UpstreamFailure>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, prompt: &PreviewPrompt) -> Result<Completion, UpstreamFailure> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamFailure::transport("no scripted response")))
        }
    }

    /// Store wrapper that counts operations and can fail writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl UsageStore for CountingStore {
        fn get_usage(&self, period: &PeriodKey) -> kata_preview_store::Result<UsageRecord> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_usage(period)
        }

        fn increment_usage(
            &self,
            period: &PeriodKey,
            delta: &UsageDelta,
        ) -> kata_preview_store::Result<UsageRecord> {
            if self.fail_writes {
                return Err(StoreError::Database("disk full".into()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.increment_usage(period, delta)
        }

        fn list_usage(&self, limit: usize) -> kata_preview_store::Result<Vec<UsageRecord>> {
            self.inner.list_usage(limit)
        }
    }

    struct Fixture {
        generator: PreviewGenerator,
        store: Arc<CountingStore>,
        backend: Arc<ScriptedBackend>,
        clock: Arc<FixedClock>,
        ledger: BudgetLedger,
    }

    fn september() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 14, 12, 0, 0).unwrap()
    }

    fn fixture_with(store: CountingStore, responses: Vec<Result<Completion, UpstreamFailure>>) -> Fixture {
        let store = Arc::new(store);
        let backend = ScriptedBackend::with(responses);
        let clock = Arc::new(FixedClock::new(september()));
        let ledger = BudgetLedger::new(store.clone());
        let generator = PreviewGenerator::new(
            ledger.clone(),
            backend.clone(),
            clock.clone(),
            BudgetPolicy::default(),
        );
        Fixture {
            generator,
            store,
            backend,
            clock,
            ledger,
        }
    }

    fn fixture(responses: Vec<Result<Completion, UpstreamFailure>>) -> Fixture {
        fixture_with(CountingStore::default(), responses)
    }

    fn seed_spend(f: &Fixture, cost_usd: f64) {
        f.store
            .inner
            .increment_usage(
                &PeriodKey::from_datetime(september()),
                &UsageDelta {
                    tokens_in: 0,
                    tokens_out: 0,
                    cost_usd,
                    at: september(),
                },
            )
            .unwrap();
    }

    fn spent(f: &Fixture) -> f64 {
        f.ledger
            .get_spent(&PeriodKey::from_datetime(f.clock.now()))
            .unwrap()
    }

    fn caller() -> CallerIdentity {
        CallerIdentity::new("user-1")
    }

    #[tokio::test]
    async fn missing_identity_touches_nothing() {
        let f = fixture(vec![ok_completion(1000, 500)]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), None)
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::Unauthenticated);
        assert_eq!(f.store.reads.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test]
    async fn blank_uid_is_unauthenticated() {
        let f = fixture(vec![ok_completion(1000, 500)]);
        let blank = CallerIdentity::new("  ");

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&blank))
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::Unauthenticated);
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test]
    async fn success_returns_candidate_and_commits_exact_cost() {
        let f = fixture(vec![ok_completion(1000, 500)]);
        let request = GenerationRequest {
            influence: Some("  debounce  ".into()),
            language: Some(Language::Go),
            difficulty: Some(Difficulty::Warmup),
            length: Some(KataLength::DeepDive),
        };

        let result = f
            .generator
            .generate_preview(&request, Some(&caller()))
            .await
            .unwrap();

        assert_eq!(result.candidate.title, "Debounce It");
        assert_eq!(result.meta.language, Language::Go);
        assert_eq!(result.meta.difficulty, Difficulty::Warmup);
        assert_eq!(result.meta.length, KataLength::DeepDive);
        assert_eq!(result.meta.est_minutes, 75);
        assert_eq!(result.meta.usage.month.as_str(), "2025-09");
        assert!((result.meta.usage.this_call_usd - 0.0018).abs() < 1e-9);
        assert!((result.meta.usage.spent_usd - 0.0018).abs() < 1e-9);
        assert!((result.meta.usage.budget_usd - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.meta.usage.tokens.input, 1000);
        assert_eq!(result.meta.usage.tokens.output, 500);

        assert_eq!(f.store.writes.load(Ordering::SeqCst), 1);
        assert!((spent(&f) - 0.0018).abs() < 1e-9);

        let prompts = f.backend.prompts.lock().unwrap();
        assert!(prompts[0].system.contains("difficulty=Beginner"));
        assert!(prompts[0].system.contains("target time=75 min"));
        assert!(prompts[0].user.contains("Influence/focus: debounce"));
    }

    #[tokio::test]
    async fn defaults_apply_to_empty_request() {
        let f = fixture(vec![ok_completion(10, 10)]);

        let result = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap();

        assert_eq!(result.meta.language, Language::Typescript);
        assert_eq!(result.meta.difficulty, Difficulty::Medium);
        assert_eq!(result.meta.length, KataLength::Standard);
        assert_eq!(result.meta.est_minutes, 35);
        let prompts = f.backend.prompts.lock().unwrap();
        assert!(!prompts[0].user.contains("Influence/focus"));
    }

    #[tokio::test]
    async fn over_cap_rejects_without_calling_provider() {
        let f = fixture(vec![ok_completion(1000, 500)]);
        seed_spend(&f, 0.5);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PreviewError::BudgetExhausted {
                denial: BudgetDenial::OverCap,
                ..
            }
        ));
        assert_eq!(f.backend.calls(), 0);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn near_cap_rejects_without_calling_provider() {
        let f = fixture(vec![ok_completion(1000, 500)]);
        seed_spend(&f, 0.498);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        match err {
            PreviewError::BudgetExhausted {
                denial,
                spent_usd,
                budget_usd,
            } => {
                assert_eq!(denial, BudgetDenial::NearCap);
                assert!((spent_usd - 0.498).abs() < 1e-9);
                assert!((budget_usd - 0.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.backend.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_output_records_no_spend() {
        let f = fixture(vec![Ok(Completion {
            content: Some("not json".into()),
            finish_reason: Some("length".into()),
            prompt_tokens: Some(1000),
            completion_tokens: Some(500),
            ..Completion::default()
        })]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert!(matches!(err, PreviewError::UpstreamMalformedResponse(_)));
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
        assert!(spent(&f).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn refusal_is_malformed_and_names_the_refusal() {
        let f = fixture(vec![Ok(Completion {
            refusal: Some("I can't help with that.".into()),
            finish_reason: Some("stop".into()),
            prompt_tokens: Some(900),
            completion_tokens: Some(12),
            ..Completion::default()
        })]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PreviewError::UpstreamMalformedResponse("model refused: I can't help with that.".into())
        );
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_content_is_malformed() {
        let f = fixture(vec![Ok(Completion::default())]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert!(matches!(err, PreviewError::UpstreamMalformedResponse(_)));
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quota_failure_is_classified_and_not_recorded() {
        let f = fixture(vec![Err(UpstreamFailure {
            status: Some(429),
            message: "You exceeded your current quota, please check your plan.".into(),
            code: Some("insufficient_quota".into()),
        })]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::UpstreamQuotaExceeded);
        assert_eq!(f.backend.calls(), 1);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let f = fixture(vec![
            Err(UpstreamFailure {
                status: Some(429),
                message: "Rate limit reached for requests".into(),
                code: None,
            }),
            ok_completion(1000, 500),
        ]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::UpstreamRateLimited);
        assert_eq!(f.backend.calls(), 1);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_is_internal() {
        let f = fixture(vec![Err(UpstreamFailure::transport("connection reset"))]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::InternalUnknown("connection reset".into()));
    }

    #[tokio::test]
    async fn missing_usage_counts_as_zero_cost_call() {
        let f = fixture(vec![Ok(Completion {
            content: Some(candidate_json()),
            ..Completion::default()
        })]);

        let result = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap();

        assert!(result.meta.usage.this_call_usd.abs() < f64::EPSILON);
        let record = f
            .ledger
            .usage(&PeriodKey::from_datetime(september()))
            .unwrap();
        assert_eq!(record.call_count, 1);
        assert!(record.spent_usd.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_commit_surfaces_internal_error() {
        let store = CountingStore {
            fail_writes: true,
            ..CountingStore::default()
        };
        let f = fixture_with(store, vec![ok_completion(1000, 500)]);

        let err = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), kata_preview_core::ErrorKind::InternalUnknown);
        assert_eq!(f.backend.calls(), 1);
    }

    #[tokio::test]
    async fn month_rollover_restores_budget() {
        let f = fixture(vec![ok_completion(1000, 500)]);
        seed_spend(&f, 0.5);

        f.clock
            .set(Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 1).unwrap());

        let result = f
            .generator
            .generate_preview(&GenerationRequest::default(), Some(&caller()))
            .await
            .unwrap();

        assert_eq!(result.meta.usage.month.as_str(), "2025-10");
        assert!((result.meta.usage.spent_usd - 0.0018).abs() < 1e-9);
        assert!(
            (f.ledger
                .get_spent(&PeriodKey::from_datetime(september()))
                .unwrap()
                - 0.5)
                .abs()
                < 1e-9
        );
    }

    #[tokio::test]
    async fn concurrent_successes_all_commit() {
        let responses = (0..5).map(|_| ok_completion(1000, 500)).collect();
        let f = fixture(responses);
        let generator = Arc::new(f.generator.clone());

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move {
                    generator
                        .generate_preview(
                            &GenerationRequest::default(),
                            Some(&CallerIdentity::new(format!("user-{i}"))),
                        )
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = f
            .ledger
            .usage(&PeriodKey::from_datetime(september()))
            .unwrap();
        assert_eq!(record.call_count, 5);
        assert!((record.spent_usd - 0.009).abs() < 1e-9);
    }
}
