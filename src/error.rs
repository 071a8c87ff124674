//! Error types for the pdf2ledger library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LedgerError`] is **fatal**: the pipeline cannot proceed at all
//!   (unreadable document, provider not configured, the model returned
//!   something that is not JSON). Returned as `Err(LedgerError)` from the
//!   top-level `analyze` / `plan` / `process` functions.
//!
//! * [`CallError`] is **non-fatal**: a single bookkeeping call failed while a
//!   plan was being executed. Stored inside [`crate::plan::CallResult`] so the
//!   remaining calls still run and the caller gets a full audit trail.
//!
//! Extraction and planning abort on the first failure; plan execution never
//! does.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`].
///
/// Lets callers branch on the failure family without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document could not be read or encoded.
    Encoding,
    /// The LLM provider was unreachable or answered with a non-2xx status.
    Provider,
    /// The extraction response held no usable JSON object.
    Parse,
    /// The planner response was not a valid JSON plan.
    PlanParse,
    /// Required invoice fields were missing or inconsistent.
    Validation,
    /// The bookkeeping backend rejected a request.
    Backend,
    /// The pipeline was misconfigured.
    Config,
    /// Anything else.
    Internal,
}

/// All fatal errors returned by the pdf2ledger library.
///
/// Per-call failures during plan execution use [`CallError`] and are stored
/// in [`crate::plan::CallResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Encoding errors ───────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Invoice file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but contained no bytes.
    #[error("Invoice file '{path}' is empty")]
    EmptyDocument { path: PathBuf },

    /// Any other I/O failure while reading the document.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The provider has no API key or endpoint.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The request never produced an HTTP response.
    #[error("Transport error calling '{provider}': {reason}")]
    Transport { provider: String, reason: String },

    /// The provider answered with a non-2xx status.
    #[error("LLM API error from '{provider}' ({status}): {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider answered 2xx but without any candidate text.
    #[error("LLM provider '{provider}' returned no text: {detail}")]
    EmptyResponse { provider: String, detail: String },

    // ── Output parsing errors ─────────────────────────────────────────────
    /// No JSON object could be extracted from the extraction response, or it
    /// did not match the invoice shape.
    #[error("Could not extract invoice JSON from the model response: {reason}")]
    Parse { reason: String },

    /// The planner response was not a valid JSON plan.
    #[error("Model did not return a valid JSON plan: {reason}")]
    PlanParse { reason: String, raw: String },

    /// Essential invoice fields were missing or inconsistent.
    #[error("Invoice data failed validation: {reason}")]
    Validation { reason: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// A bookkeeping call made outside plan execution failed.
    #[error("Bookkeeping API call {method} {endpoint} failed: {source}")]
    Backend {
        method: String,
        endpoint: String,
        #[source]
        source: CallError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// The failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::FileNotFound { .. }
            | LedgerError::PermissionDenied { .. }
            | LedgerError::EmptyDocument { .. }
            | LedgerError::ReadFailed { .. } => ErrorKind::Encoding,
            LedgerError::Transport { .. }
            | LedgerError::Provider { .. }
            | LedgerError::EmptyResponse { .. } => ErrorKind::Provider,
            LedgerError::Parse { .. } => ErrorKind::Parse,
            LedgerError::PlanParse { .. } => ErrorKind::PlanParse,
            LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::Backend { .. } => ErrorKind::Backend,
            LedgerError::ProviderNotConfigured { .. } | LedgerError::InvalidConfig(_) => {
                ErrorKind::Config
            }
            LedgerError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        LedgerError::Parse {
            reason: reason.into(),
        }
    }
}

/// A non-fatal error for a single bookkeeping call.
///
/// Stored alongside [`crate::plan::CallResult`] when a call fails. Plan
/// execution continues with the next call regardless.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallError {
    /// The backend answered with a non-2xx status.
    #[error("Request failed with status code {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The backend answered 2xx but the body was not the expected JSON.
    #[error("Invalid response body: {reason}")]
    InvalidResponse { reason: String },

    /// A create-movement call had neither a final record nor its own payload.
    #[error("No payload available for {endpoint}")]
    MissingPayload { endpoint: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_carries_status_text() {
        let e = LedgerError::Provider {
            provider: "gemini".into(),
            status: 403,
            message: "Forbidden".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("Forbidden"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Provider);
    }

    #[test]
    fn encoding_variants_share_a_kind() {
        let path = PathBuf::from("nf.pdf");
        assert_eq!(
            LedgerError::FileNotFound { path: path.clone() }.kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            LedgerError::EmptyDocument { path }.kind(),
            ErrorKind::Encoding
        );
    }

    #[test]
    fn plan_parse_is_distinct_from_parse() {
        let plan = LedgerError::PlanParse {
            reason: "expected value".into(),
            raw: "nope".into(),
        };
        assert_eq!(plan.kind(), ErrorKind::PlanParse);
        assert_eq!(LedgerError::parse("x").kind(), ErrorKind::Parse);
    }

    #[test]
    fn call_error_serialises_with_kind_tag() {
        let e = CallError::Rejected {
            status: 500,
            message: "boom".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "rejected");
        assert_eq!(json["status"], 500);
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn backend_error_wraps_call_error() {
        let e = LedgerError::Backend {
            method: "GET".into(),
            endpoint: "/pessoas".into(),
            source: CallError::Transport {
                reason: "connection refused".into(),
            },
        };
        assert_eq!(e.kind(), ErrorKind::Backend);
        assert!(e.to_string().contains("/pessoas"));
    }
}
