//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use kata_preview_core::{BudgetPolicy, TokenPricing};

/// Default Firebase secure-token JWKS endpoint.
const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/kata-preview").
    pub data_dir: String,

    /// JWKS endpoint used to verify ID tokens.
    pub auth_jwks_url: String,

    /// Expected JWT issuer.
    pub auth_issuer: String,

    /// Expected JWT audience.
    pub auth_audience: String,

    /// OpenAI-compatible API base URL (default: `<https://api.openai.com>`).
    pub openai_base_url: String,

    /// OpenAI API key. Previews fail with an internal error when absent.
    pub openai_api_key: Option<String>,

    /// Chat model used for previews.
    pub openai_model: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum number of preview generations in flight.
    pub max_concurrent_previews: usize,

    /// Monthly cap, worst-case estimate and token pricing.
    pub budget: BudgetPolicy,
}

/// OpenAI secrets file structure.
#[derive(Debug, Deserialize)]
struct OpenAiSecrets {
    api_key: String,
    #[serde(default)]
    base_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (openai_api_key, secrets_base_url) = load_openai_secrets();

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .or(secrets_base_url)
            .unwrap_or(defaults.openai_base_url);

        let pricing = pricing_from_env(defaults.budget.pricing);

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            auth_jwks_url: std::env::var("AUTH_JWKS_URL").unwrap_or(defaults.auth_jwks_url),
            auth_issuer: std::env::var("AUTH_ISSUER").unwrap_or(defaults.auth_issuer),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            openai_base_url,
            openai_api_key,
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
            ),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            max_concurrent_previews: env_or(
                "MAX_CONCURRENT_PREVIEWS",
                defaults.max_concurrent_previews,
            )
            .max(1),
            budget: BudgetPolicy {
                monthly_cap_usd: usd_from_env("PREVIEW_BUDGET_USD", defaults.budget.monthly_cap_usd),
                worst_case_call_usd: usd_from_env(
                    "PREVIEW_MAX_CALL_USD",
                    defaults.budget.worst_case_call_usd,
                ),
                pricing,
            },
        }
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = %name, value = %raw, "Ignoring malformed configuration value");
            default
        }),
        Err(_) => default,
    }
}

/// Read a dollar amount; unset, malformed, negative or non-finite values
/// keep the default.
fn usd_from_env(name: &str, default: f64) -> f64 {
    parse_usd(name, std::env::var(name).ok().as_deref(), default)
}

fn parse_usd(name: &str, raw: Option<&str>, default: f64) -> f64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => {
            tracing::warn!(
                var = %name,
                value = %raw,
                default,
                "Ignoring invalid dollar amount; expected a finite, non-negative number"
            );
            default
        }
    }
}

/// Token prices are configured per million tokens; unset or invalid values
/// keep the defaults untouched.
fn pricing_from_env(defaults: TokenPricing) -> TokenPricing {
    pricing_from(
        std::env::var("PRICE_IN_PER_MTOK").ok().as_deref(),
        std::env::var("PRICE_OUT_PER_MTOK").ok().as_deref(),
        defaults,
    )
}

fn pricing_from(
    input_per_mtok: Option<&str>,
    output_per_mtok: Option<&str>,
    defaults: TokenPricing,
) -> TokenPricing {
    let per_token = |name: &str, raw: Option<&str>, default_per_token: f64| {
        parse_usd(name, raw, default_per_token * 1_000_000.0) / 1_000_000.0
    };

    TokenPricing {
        input_usd_per_token: per_token(
            "PRICE_IN_PER_MTOK",
            input_per_mtok,
            defaults.input_usd_per_token,
        ),
        output_usd_per_token: per_token(
            "PRICE_OUT_PER_MTOK",
            output_per_mtok,
            defaults.output_usd_per_token,
        ),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load the OpenAI key (and optional base URL) from file or environment.
fn load_openai_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/openai.json",
        "kata-preview/.secrets/openai.json",
        "../.secrets/openai.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<OpenAiSecrets>(path) {
            tracing::info!(path = %path, "Loaded OpenAI secrets from file");
            return (Some(secrets.api_key), secrets.base_url);
        }
    }

    tracing::debug!("OpenAI secrets file not found, using environment variables");
    (std::env::var("OPENAI_API_KEY").ok(), None)
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<T, std::io::Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/kata-preview".into(),
            auth_jwks_url: DEFAULT_JWKS_URL.into(),
            auth_issuer: "https://securetoken.google.com/kata-keeper".into(),
            auth_audience: "kata-keeper".into(),
            openai_base_url: "https://api.openai.com".into(),
            openai_api_key: None,
            openai_model: crate::openai::DEFAULT_MODEL.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 120,
            max_concurrent_previews: 5,
            budget: BudgetPolicy::default(),
        }
    }
}
