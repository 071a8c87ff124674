//! Configuration types for the invoice pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Unset connection settings fall back to the
//! process environment when the provider or backend is resolved:
//!
//! | Setting | Environment variable | Default |
//! |---------|----------------------|---------|
//! | `api_key` | `GEMINI_API_KEY` | none (provider calls fail) |
//! | `provider_url` | `GEMINI_API_URL` | derived from `model` |
//! | `model` | `GEMINI_MODEL` | `gemini-2.5-flash` |
//! | `backend_url` | `FINANCEIRO_API_URL` | [`DEFAULT_BACKEND_URL`] |

use crate::backend::{BookkeepingApi, DEFAULT_BACKEND_URL};
use crate::error::LedgerError;
use crate::progress::ProgressCallback;
use crate::provider::LlmProvider;
use std::fmt;
use std::sync::Arc;

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_URL: &str = "GEMINI_API_URL";
pub const ENV_MODEL: &str = "GEMINI_MODEL";
pub const ENV_BACKEND_URL: &str = "FINANCEIRO_API_URL";

/// Configuration for the extract → plan → execute pipeline.
///
/// # Example
/// ```rust
/// use pdf2ledger::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .model("gemini-2.5-flash")
///     .backend_url("http://localhost:3000/api/financeiro")
///     .strict_validation(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Pre-constructed LLM provider. Takes precedence over `api_key`,
    /// `provider_url` and `model`.
    pub provider: Option<Arc<dyn LlmProvider>>,

    /// Pre-constructed backend client. Takes precedence over `backend_url`.
    pub backend: Option<Arc<dyn BookkeepingApi>>,

    /// Gemini API key. If None, read from `GEMINI_API_KEY`.
    pub api_key: Option<String>,

    /// Full `generateContent` URL. If None, read from `GEMINI_API_URL`, else
    /// derived from `model`.
    pub provider_url: Option<String>,

    /// Model identifier. If None, read from `GEMINI_MODEL`, else
    /// `gemini-2.5-flash`.
    pub model: Option<String>,

    /// Bookkeeping API root. If None, read from `FINANCEIRO_API_URL`, else
    /// [`DEFAULT_BACKEND_URL`].
    pub backend_url: Option<String>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Custom extraction instruction. If None, uses the built-in prompt.
    pub extraction_prompt: Option<String>,

    /// Custom planner system instruction. If None, uses the built-in prompt.
    pub planner_prompt: Option<String>,

    /// Enforce installment-count and non-negative amount checks on extracted
    /// invoices. Default: true.
    ///
    /// The supplier and invoice-number presence checks always run.
    pub strict_validation: bool,

    /// Per-request timeout for provider and backend calls. Default: None
    /// (wait indefinitely).
    pub request_timeout_secs: Option<u64>,

    /// Receives plan execution events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: None,
            backend: None,
            api_key: None,
            provider_url: None,
            model: None,
            backend_url: None,
            temperature: None,
            extraction_prompt: None,
            planner_prompt: None,
            strict_validation: true,
            request_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn BookkeepingApi>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_url", &self.provider_url)
            .field("model", &self.model)
            .field("backend_url", &self.backend_url)
            .field("temperature", &self.temperature)
            .field("strict_validation", &self.strict_validation)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Backend root: explicit setting, then environment, then default.
    pub fn resolved_backend_url(&self) -> String {
        self.backend_url
            .clone()
            .or_else(|| non_empty_env(ENV_BACKEND_URL))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    /// Model name: explicit setting, then environment, then default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .or_else(|| non_empty_env(ENV_MODEL))
            .unwrap_or_else(|| crate::provider::gemini::DEFAULT_MODEL.to_string())
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn BookkeepingApi>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn planner_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.planner_prompt = Some(prompt.into());
        self
    }

    pub fn strict_validation(mut self, v: bool) -> Self {
        self.config.strict_validation = v;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, LedgerError> {
        let c = &self.config;
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(LedgerError::InvalidConfig(format!(
                    "Temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        if c.request_timeout_secs == Some(0) {
            return Err(LedgerError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        for url in [&c.backend_url, &c.provider_url].into_iter().flatten() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(LedgerError::InvalidConfig(format!(
                    "'{url}' is not an HTTP/HTTPS URL"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_without_timeout() {
        let c = PipelineConfig::default();
        assert!(c.strict_validation);
        assert_eq!(c.request_timeout_secs, None);
        assert!(c.provider.is_none());
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        let err = PipelineConfig::builder().temperature(3.5).build().unwrap_err();
        assert!(err.to_string().contains("Temperature"));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(PipelineConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_non_http_backend() {
        let err = PipelineConfig::builder()
            .backend_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn explicit_backend_url_wins() {
        let c = PipelineConfig::builder()
            .backend_url("http://localhost:3000/api/financeiro")
            .build()
            .unwrap();
        assert_eq!(c.resolved_backend_url(), "http://localhost:3000/api/financeiro");
    }

    #[test]
    fn debug_hides_api_key() {
        let c = PipelineConfig::builder().api_key("super-secret").build().unwrap();
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
