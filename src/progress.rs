//! Progress-callback trait for plan execution events.
//!
//! Inject an [`Arc<dyn ExecutionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the executor walks a plan.
//!
//! # Example
//!
//! ```rust
//! use pdf2ledger::{ExecutionProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl ExecutionProgressCallback for CountingCallback {
//!     fn on_call_error(&self, index: usize, total: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("call {}/{} failed: {}", index, total, error);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the plan executor as it processes each call.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based positions in `plan.calls`.
pub trait ExecutionProgressCallback: Send + Sync {
    /// Called once before the first call.
    fn on_plan_start(&self, total_calls: usize) {
        let _ = total_calls;
    }

    /// Called just before a recognised call is sent.
    fn on_call_start(&self, index: usize, total: usize, description: &str) {
        let _ = (index, total, description);
    }

    /// Called when a call succeeded.
    fn on_call_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a call failed. Execution continues with the next call.
    fn on_call_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called when a call's endpoint/method pair is not recognised and the
    /// call is skipped without a result.
    fn on_call_skipped(&self, index: usize, total: usize, method: &str, endpoint: &str) {
        let _ = (index, total, method, endpoint);
    }

    /// Called once after every call has been attempted or skipped.
    fn on_plan_complete(&self, total_calls: usize, success_count: usize) {
        let _ = (total_calls, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExecutionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ExecutionProgressCallback>;
