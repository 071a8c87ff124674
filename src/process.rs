//! Pipeline entry points.
//!
//! [`process`] runs as many stages as the [`ProcessingMode`] asks for; the
//! per-stage functions ([`analyze`], [`plan`], [`execute`]) are exposed for
//! callers that want to inspect or edit intermediate results, e.g. to show
//! a plan to a human before executing it.

use crate::backend::{BookkeepingApi, HttpBookkeeping};
use crate::config::{non_empty_env, PipelineConfig, ENV_API_KEY, ENV_API_URL};
use crate::error::LedgerError;
use crate::invoice::InvoiceData;
use crate::output::{ProcessingMode, ProcessingOutput, ProcessingStats};
use crate::pipeline::{encode, execute::execute_plan, extract, plan::plan_invoice};
use crate::plan::{ApiCallPlan, CallResult};
use crate::provider::{GeminiProvider, LlmProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract invoice data from the PDF at `path`.
///
/// # Errors
/// Encoding errors for unreadable files, provider errors for failed model
/// calls, and parse/validation errors for unusable model output.
pub async fn analyze(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<InvoiceData, LedgerError> {
    let path = path.as_ref();
    info!("Analyzing invoice: {}", path.display());

    let provider = resolve_provider(config)?;
    let document = encode::encode_document(path).await?;
    extract::extract_invoice(provider.as_ref(), &document, config).await
}

/// Extract invoice data from PDF bytes already in memory.
///
/// # Example
/// ```rust,no_run
/// use pdf2ledger::{analyze_bytes, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("nota.pdf")?;
/// let invoice = analyze_bytes(&bytes, &PipelineConfig::default()).await?;
/// println!("{} {}", invoice.invoice_number, invoice.total_amount);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
) -> Result<InvoiceData, LedgerError> {
    if bytes.is_empty() {
        return Err(LedgerError::EmptyDocument {
            path: "<memory>".into(),
        });
    }
    let provider = resolve_provider(config)?;
    let document = encode::encode_bytes(bytes);
    extract::extract_invoice(provider.as_ref(), &document, config).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<InvoiceData, LedgerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LedgerError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze(path, config))
}

/// Build a reconciliation plan for `invoice`. Reads `/pessoas`, writes
/// nothing.
pub async fn plan(
    invoice: &InvoiceData,
    config: &PipelineConfig,
) -> Result<ApiCallPlan, LedgerError> {
    let provider = resolve_provider(config)?;
    let backend = resolve_backend(config)?;
    plan_invoice(provider.as_ref(), backend.as_ref(), invoice, config).await
}

/// Execute `plan` against the backend.
///
/// Only configuration problems are fatal; per-call failures are reported in
/// the returned results.
pub async fn execute(
    plan: &ApiCallPlan,
    config: &PipelineConfig,
) -> Result<Vec<CallResult>, LedgerError> {
    let backend = resolve_backend(config)?;
    Ok(execute_plan(backend.as_ref(), plan, config.progress_callback.as_deref()).await)
}

/// Run the pipeline on the PDF at `path` up to `mode`.
///
/// # Example
/// ```rust,no_run
/// use pdf2ledger::{process, PipelineConfig, ProcessingMode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = process("nota.pdf", ProcessingMode::Execute, &PipelineConfig::default()).await?;
/// eprintln!(
///     "{}/{} calls succeeded",
///     output.stats.calls_succeeded, output.stats.calls_planned
/// );
/// # Ok(())
/// # }
/// ```
pub async fn process(
    path: impl AsRef<Path>,
    mode: ProcessingMode,
    config: &PipelineConfig,
) -> Result<ProcessingOutput, LedgerError> {
    let total_start = Instant::now();
    let path = path.as_ref();
    info!("Processing invoice {} (mode: {:?})", path.display(), mode);

    let provider = resolve_provider(config)?;
    // Resolved up front so a bad backend setting fails before the model call.
    let backend = match mode {
        ProcessingMode::Extract => None,
        ProcessingMode::Plan | ProcessingMode::Execute => Some(resolve_backend(config)?),
    };
    let mut stats = ProcessingStats::default();

    // ── Step 1: Encode + extract ─────────────────────────────────────────
    let stage = Instant::now();
    let document = encode::encode_document(path).await?;
    let invoice = extract::extract_invoice(provider.as_ref(), &document, config).await?;
    stats.extraction_ms = elapsed_ms(stage);

    let Some(backend) = backend else {
        stats.total_ms = elapsed_ms(total_start);
        return Ok(ProcessingOutput {
            invoice,
            plan: None,
            results: Vec::new(),
            stats,
        });
    };

    // ── Step 2: Plan ─────────────────────────────────────────────────────
    let stage = Instant::now();
    let plan = plan_invoice(provider.as_ref(), backend.as_ref(), &invoice, config).await?;
    stats.planning_ms = elapsed_ms(stage);
    stats.calls_planned = plan.calls.len();

    // ── Step 3: Execute ──────────────────────────────────────────────────
    let mut results = Vec::new();
    if mode == ProcessingMode::Execute {
        let stage = Instant::now();
        results = execute_plan(backend.as_ref(), &plan, config.progress_callback.as_deref()).await;
        stats.execution_ms = elapsed_ms(stage);
        stats.record_execution(&plan, &results);
    }

    stats.total_ms = elapsed_ms(total_start);
    info!(
        "Processing complete: {} planned, {} succeeded, {} failed, {}ms total",
        stats.calls_planned, stats.calls_succeeded, stats.calls_failed, stats.total_ms
    );

    Ok(ProcessingOutput {
        invoice,
        plan: Some(plan),
        results,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Gemini** with the key from `config.api_key` or `GEMINI_API_KEY`, and
///    the endpoint from `config.provider_url`, `GEMINI_API_URL`, or the
///    standard URL for the resolved model.
///
/// A missing key fails here, before any network traffic.
pub(crate) fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Arc<dyn LlmProvider>, LedgerError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| non_empty_env(ENV_API_KEY))
        .unwrap_or_default();
    let endpoint = config
        .provider_url
        .clone()
        .or_else(|| non_empty_env(ENV_API_URL))
        .unwrap_or_else(|| GeminiProvider::endpoint_for_model(&config.resolved_model()));
    debug!("Using Gemini endpoint {endpoint}");

    let provider = GeminiProvider::new(api_key, endpoint, config.request_timeout_secs)?;
    Ok(Arc::new(provider))
}

/// Pre-built backend, else an HTTP client for the resolved backend URL.
pub(crate) fn resolve_backend(
    config: &PipelineConfig,
) -> Result<Arc<dyn BookkeepingApi>, LedgerError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let url = config.resolved_backend_url();
    debug!("Using bookkeeping backend {url}");
    let backend = HttpBookkeeping::new(url, config.request_timeout_secs)
        .map_err(|e| LedgerError::Internal(e.to_string()))?;
    Ok(Arc::new(backend))
}

/// Milliseconds since `start`, saturating instead of truncating.
fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallError, ErrorKind};
    use crate::provider::GenerateRequest;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::io::Write;
    use std::sync::Mutex;

    const INVOICE_JSON: &str = r#"{"fornecedor":{"razaoSocial":"Agro Ltda","cnpj":"12345678000190"},
        "faturado":{"nomeCompleto":"João","cpfCnpj":"12345678901"},
        "numeroNotaFiscal":"123","dataEmissao":"2024-03-15","produtos":[],
        "quantidadeParcelas":1,"parcelas":[{"numero":1,"dataVencimento":"2024-04-15","valor":100}],
        "valorTotal":100,
        "classificacaoDespesa":{"categoria":"MANUTENCAO_E_OPERACAO","justificativa":"x"}}"#;

    const PLAN_JSON: &str = r#"{"calls":[
        {"endpoint":"/pessoas","method":"POST","data":{"tipo":"PJ"},"description":"create supplier"},
        {"endpoint":"/movimentos","method":"POST","description":"create movement"}],
        "ids":{},"finalMovimentoData":{"tipo":"APAGAR"}}"#;

    /// Answers the extraction request (the one carrying the PDF) with an
    /// invoice and anything else with a plan.
    struct ScriptedProvider;

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<String, LedgerError> {
            let has_document = request
                .parts
                .iter()
                .any(|p| matches!(p, crate::provider::Part::InlineData { .. }));
            Ok(if has_document {
                format!("Segue: {INVOICE_JSON}")
            } else {
                format!("```json\n{PLAN_JSON}\n```")
            })
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        posts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BookkeepingApi for RecordingBackend {
        async fn get(&self, _path: &str) -> Result<Value, CallError> {
            Ok(json!([]))
        }

        async fn post(&self, path: &str, _body: &Value) -> Result<Value, CallError> {
            self.posts.lock().unwrap().push(path.to_string());
            Ok(json!({"id": 1}))
        }
    }

    fn pdf_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        file
    }

    fn config(backend: Arc<RecordingBackend>) -> PipelineConfig {
        PipelineConfig::builder()
            .provider(Arc::new(ScriptedProvider))
            .backend(backend)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn extract_mode_never_touches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let file = pdf_file();
        let out = process(file.path(), ProcessingMode::Extract, &config(backend.clone()))
            .await
            .unwrap();

        assert_eq!(out.invoice.invoice_number, "123");
        assert!(out.plan.is_none());
        assert!(backend.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn plan_mode_writes_nothing() {
        let backend = Arc::new(RecordingBackend::default());
        let file = pdf_file();
        let out = process(file.path(), ProcessingMode::Plan, &config(backend.clone()))
            .await
            .unwrap();

        assert_eq!(out.plan.as_ref().map(|p| p.calls.len()), Some(2));
        assert_eq!(out.stats.calls_planned, 2);
        assert!(out.results.is_empty());
        assert!(backend.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn execute_mode_runs_every_call() {
        let backend = Arc::new(RecordingBackend::default());
        let file = pdf_file();
        let out = process(file.path(), ProcessingMode::Execute, &config(backend.clone()))
            .await
            .unwrap();

        assert_eq!(out.results.len(), 2);
        assert!(out.all_calls_succeeded());
        assert_eq!(out.stats.calls_succeeded, 2);
        assert_eq!(
            *backend.posts.lock().unwrap(),
            vec!["/pessoas".to_string(), "/movimentos".to_string()]
        );
    }

    #[tokio::test]
    async fn analyze_bytes_rejects_empty_input() {
        let backend = Arc::new(RecordingBackend::default());
        let err = analyze_bytes(&[], &config(backend)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn blank_api_key_is_provider_not_configured() {
        let c = PipelineConfig::builder().api_key("   ").build().unwrap();
        let err = resolve_provider(&c).err().unwrap();
        assert!(matches!(err, LedgerError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn explicit_key_builds_gemini_provider() {
        let c = PipelineConfig::builder()
            .api_key("test-key")
            .provider_url("http://127.0.0.1:9/v1beta/models/x:generateContent")
            .build()
            .unwrap();
        let provider = resolve_provider(&c).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn elapsed_ms_measures_from_start() {
        let start = Instant::now() - std::time::Duration::from_millis(250);
        let ms = elapsed_ms(start);
        assert!((250..60_000).contains(&ms), "got {ms}");
    }
}
