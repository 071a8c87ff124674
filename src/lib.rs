//! # pdf2ledger
//!
//! Turn Brazilian purchase invoices (NF-e PDFs) into bookkeeping records
//! using a multimodal LLM.
//!
//! ## Why this crate?
//!
//! Invoice layouts vary wildly between issuers, so template-based parsers
//! break constantly. Instead the PDF goes to Gemini as-is, the model returns
//! structured invoice JSON, and a second model call works out which
//! counterparties and expense classification already exist in the backend
//! and which must be created before the movement can be recorded.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Encode   read the file, base64 for an inline_data part
//!  ├─ 2. Extract  Gemini reads the PDF → InvoiceData (validated)
//!  ├─ 3. Plan     GET /pessoas + Gemini → ApiCallPlan
//!  └─ 4. Execute  plan calls in order against /api/financeiro
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2ledger::{process, PipelineConfig, ProcessingMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from GEMINI_API_KEY, backend from FINANCEIRO_API_URL
//!     let config = PipelineConfig::default();
//!     let output = process("nota.pdf", ProcessingMode::Plan, &config).await?;
//!     println!("{}", pdf2ledger::display::render_invoice(&output.invoice));
//!     if let Some(plan) = &output.plan {
//!         println!("{}", pdf2ledger::display::render_plan(plan));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2ledger` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2ledger = { version = "0.1", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Extraction and planning fail fast with a [`LedgerError`]. Execution never
//! fails as a whole: each call's outcome is a [`CallResult`], and a failed
//! call does not stop the ones after it. There is no rollback, so a failed
//! run can leave counterparties created without the movement that needed
//! them.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod invoice;
mod lenient;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod records;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BookkeepingApi, HttpBookkeeping};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{CallError, ErrorKind, LedgerError};
pub use invoice::{ExpenseCategory, InvoiceData};
pub use output::{ProcessingMode, ProcessingOutput, ProcessingStats};
pub use plan::{ApiCallPlan, CallResult, HttpMethod, PlannedCall};
pub use process::{analyze, analyze_bytes, analyze_sync, execute, plan, process};
pub use progress::{ExecutionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{GeminiProvider, LlmProvider};
