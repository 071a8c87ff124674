//! Plan execution: walk an [`ApiCallPlan`] against the bookkeeping backend.
//!
//! Calls run strictly in order, one at a time, because later calls depend on
//! records created by earlier ones. A failed call is recorded and execution
//! moves on; nothing is retried or rolled back, so a partially applied plan
//! is a possible outcome and the returned results are the audit trail.
//!
//! Only a fixed set of `(endpoint, method)` pairs is dispatched. Anything
//! else is skipped without a result entry, which means `results.len()` can
//! be smaller than `plan.calls.len()`.

use crate::backend::BookkeepingApi;
use crate::error::CallError;
use crate::plan::{ApiCallPlan, CallResult, HttpMethod, PlannedCall};
use crate::progress::ExecutionProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

/// A backend operation the executor knows how to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOperation {
    ListPessoas,
    CreatePessoa,
    ListClassificacoes,
    CreateClassificacao,
    ListMovimentos,
    /// Uses the plan's final record rather than the call's own payload.
    CreateMovimento,
    ListParcelas { id_movimento: i64 },
}

static RE_PARCELAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/movimentos/(\d+)/parcelas$").expect("valid regex"));

impl BackendOperation {
    /// Map a planned `(endpoint, method)` pair to an operation.
    ///
    /// Trailing slashes and surrounding whitespace on the endpoint are
    /// tolerated; anything else unrecognised returns `None`.
    pub fn resolve(endpoint: &str, method: HttpMethod) -> Option<Self> {
        let endpoint = endpoint.trim();
        let endpoint = endpoint
            .strip_suffix('/')
            .filter(|e| !e.is_empty())
            .unwrap_or(endpoint);

        match (method, endpoint) {
            (HttpMethod::Get, "/pessoas") => Some(Self::ListPessoas),
            (HttpMethod::Post, "/pessoas") => Some(Self::CreatePessoa),
            (HttpMethod::Get, "/classificacoes") => Some(Self::ListClassificacoes),
            (HttpMethod::Post, "/classificacoes") => Some(Self::CreateClassificacao),
            (HttpMethod::Get, "/movimentos") => Some(Self::ListMovimentos),
            (HttpMethod::Post, "/movimentos") => Some(Self::CreateMovimento),
            (HttpMethod::Get, other) => RE_PARCELAS
                .captures(other)
                .and_then(|caps| caps[1].parse().ok())
                .map(|id_movimento| Self::ListParcelas { id_movimento }),
            _ => None,
        }
    }

    async fn run(
        &self,
        backend: &dyn BookkeepingApi,
        call: &PlannedCall,
        plan: &ApiCallPlan,
    ) -> Result<Value, CallError> {
        match self {
            Self::ListPessoas => backend.get("/pessoas").await,
            Self::ListClassificacoes => backend.get("/classificacoes").await,
            Self::ListMovimentos => backend.get("/movimentos").await,
            Self::ListParcelas { id_movimento } => {
                backend
                    .get(&format!("/movimentos/{id_movimento}/parcelas"))
                    .await
            }
            Self::CreatePessoa => backend.post("/pessoas", payload_or_null(call)).await,
            Self::CreateClassificacao => {
                backend
                    .post("/classificacoes", payload_or_null(call))
                    .await
            }
            Self::CreateMovimento => {
                let body = plan
                    .final_record
                    .as_ref()
                    .or(call.payload.as_ref())
                    .ok_or_else(|| CallError::MissingPayload {
                        endpoint: call.endpoint.clone(),
                    })?;
                backend.post("/movimentos", body).await
            }
        }
    }
}

fn payload_or_null(call: &PlannedCall) -> &Value {
    static NULL: Value = Value::Null;
    call.payload.as_ref().unwrap_or(&NULL)
}

/// Execute every recognised call in `plan`, in order.
///
/// Returns one [`CallResult`] per attempted call. Unrecognised calls are
/// logged, reported to `progress` and otherwise skipped.
pub async fn execute_plan(
    backend: &dyn BookkeepingApi,
    plan: &ApiCallPlan,
    progress: Option<&dyn ExecutionProgressCallback>,
) -> Vec<CallResult> {
    let total = plan.calls.len();
    let mut results = Vec::with_capacity(total);

    if let Some(cb) = progress {
        cb.on_plan_start(total);
    }

    for (i, call) in plan.calls.iter().enumerate() {
        let index = i + 1;
        let Some(operation) = BackendOperation::resolve(&call.endpoint, call.method) else {
            warn!(
                "Call {}/{}: skipping unrecognised {} {}",
                index, total, call.method, call.endpoint
            );
            if let Some(cb) = progress {
                cb.on_call_skipped(index, total, &call.method.to_string(), &call.endpoint);
            }
            continue;
        };

        if let Some(cb) = progress {
            cb.on_call_start(index, total, &call.description);
        }

        let result = match operation.run(backend, call, plan).await {
            Ok(data) => {
                if let Some(cb) = progress {
                    cb.on_call_complete(index, total);
                }
                CallResult::ok(call, data)
            }
            Err(e) => {
                warn!(
                    "Call {}/{} {} {} failed: {}",
                    index, total, call.method, call.endpoint, e
                );
                if let Some(cb) = progress {
                    cb.on_call_error(index, total, &e.to_string());
                }
                CallResult::failed(call, e)
            }
        };
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    info!(
        "Plan executed: {}/{} calls succeeded, {} skipped",
        succeeded,
        results.len(),
        total - results.len()
    );
    if let Some(cb) = progress {
        cb.on_plan_complete(total, succeeded);
    }

    results
}
