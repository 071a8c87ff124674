//! Pipeline stages for invoice-to-ledger processing.
//!
//! Each submodule implements exactly one step. Stages take the provider and
//! backend as trait objects so each is testable with in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ extract ──▶ plan ──▶ execute
//! (base64)   (LLM+PDF)   (LLM)    (backend HTTP)
//! ```
//!
//! 1. [`encode`] reads the PDF and base64-wraps it for an `inline_data` part
//! 2. [`extract`] asks the model for invoice JSON and validates it
//! 3. [`plan`] fetches registered counterparties and asks the model which
//!    backend calls reconcile the invoice
//! 4. [`execute`] runs the plan call by call, recording each outcome
//!
//! [`json`] holds the helpers that locate JSON inside free-form model text.

pub mod encode;
pub mod execute;
pub mod extract;
pub mod json;
pub mod plan;
