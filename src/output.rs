//! Output types returned by [`crate::process::process`].

use crate::invoice::InvoiceData;
use crate::plan::{ApiCallPlan, CallResult};
use serde::{Deserialize, Serialize};

/// How far [`crate::process::process`] goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Extract the invoice only. No backend traffic.
    #[default]
    Extract,
    /// Extract, then plan. Reads `/pessoas` but writes nothing.
    Plan,
    /// Extract, plan and execute the plan against the backend.
    Execute,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutput {
    pub invoice: InvoiceData,

    /// Present in [`ProcessingMode::Plan`] and [`ProcessingMode::Execute`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ApiCallPlan>,

    /// One entry per attempted call; empty unless executed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<CallResult>,

    pub stats: ProcessingStats,
}

impl ProcessingOutput {
    /// True when nothing was executed or every attempted call succeeded.
    pub fn all_calls_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

/// Stage timings and call counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub extraction_ms: u64,
    pub planning_ms: u64,
    pub execution_ms: u64,
    pub total_ms: u64,
    pub calls_planned: usize,
    pub calls_succeeded: usize,
    pub calls_failed: usize,
    /// Planned calls with an unrecognised endpoint/method pair.
    pub calls_skipped: usize,
}

impl ProcessingStats {
    /// Fill the call counters from a plan and its execution results.
    pub(crate) fn record_execution(&mut self, plan: &ApiCallPlan, results: &[CallResult]) {
        self.calls_planned = plan.calls.len();
        self.calls_succeeded = results.iter().filter(|r| r.success).count();
        self.calls_failed = results.len() - self.calls_succeeded;
        self.calls_skipped = plan.calls.len().saturating_sub(results.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::plan::{HttpMethod, PlannedCall};

    fn planned(endpoint: &str) -> PlannedCall {
        PlannedCall {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            payload: None,
            description: String::new(),
        }
    }

    #[test]
    fn counters_account_for_skipped_calls() {
        let plan = ApiCallPlan {
            calls: vec![planned("/pessoas"), planned("/x"), planned("/classificacoes")],
            ..Default::default()
        };
        let results = vec![
            CallResult::ok(&plan.calls[0], serde_json::json!([])),
            CallResult::failed(
                &plan.calls[2],
                CallError::Transport {
                    reason: "connection refused".into(),
                },
            ),
        ];

        let mut stats = ProcessingStats::default();
        stats.record_execution(&plan, &results);
        assert_eq!(stats.calls_planned, 3);
        assert_eq!(stats.calls_succeeded, 1);
        assert_eq!(stats.calls_failed, 1);
        assert_eq!(stats.calls_skipped, 1);
    }

    #[test]
    fn mode_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProcessingMode::Execute).unwrap(),
            "\"execute\""
        );
    }
}
