//! End-to-end tests against the live Gemini API.
//!
//! These tests read invoices from `./test_cases/` and make real LLM calls.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested. Nothing here writes to the
//! bookkeeping backend.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture

use pdf2ledger::{analyze, analyze_bytes, ErrorKind, PipelineConfig};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED or the API key is not set, or no PDF
/// exists at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if std::env::var("GEMINI_API_KEY").map_or(true, |k| k.trim().is_empty()) {
            println!("SKIP: GEMINI_API_KEY is not set");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn is_document(s: &str) -> bool {
    let digits = s.chars().filter(char::is_ascii_digit).count();
    digits == 11 || digits == 14
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_analyze_sample_invoice() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("nota_fiscal.pdf"));

    let invoice = analyze(&pdf, &PipelineConfig::default())
        .await
        .expect("live extraction should succeed");

    println!("{}", pdf2ledger::display::render_invoice(&invoice));
    assert!(!invoice.invoice_number.trim().is_empty());
    assert!(is_document(&invoice.supplier.tax_id), "supplier CNPJ: {}", invoice.supplier.tax_id);
    assert!(invoice.total_amount > 0.0);
    assert_eq!(invoice.installments.len(), invoice.installment_count as usize);
}

#[tokio::test]
async fn e2e_analyze_bytes_matches_file_input() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("nota_fiscal.pdf"));
    let bytes = std::fs::read(&pdf).expect("read sample");

    let config = PipelineConfig::builder()
        .temperature(0.0)
        .build()
        .expect("valid config");
    let invoice = analyze_bytes(&bytes, &config)
        .await
        .expect("live extraction should succeed");
    assert!(!invoice.invoice_number.trim().is_empty());
}

#[tokio::test]
async fn e2e_invalid_key_is_a_provider_error() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("nota_fiscal.pdf"));

    let config = PipelineConfig::builder()
        .api_key("definitely-not-a-valid-key")
        .build()
        .expect("valid config");
    let err = analyze(&pdf, &config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider, "got: {err}");
}
