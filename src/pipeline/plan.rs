//! Reconciliation planning: invoice + known counterparties → [`ApiCallPlan`].
//!
//! The model decides which counterparties and classification already exist
//! and which must be created; this module only assembles the request,
//! strips code fences from the answer and parses it. The returned plan is
//! trusted as long as it is a valid JSON object: call ordering and ID
//! consistency are not checked here, and calls the executor cannot map are
//! skipped there rather than rejected here.
//!
//! The `/pessoas` snapshot is forwarded to the model exactly as the backend
//! returned it; the crate never needs to understand its rows to plan.

use super::json::strip_code_fences;
use crate::backend::BookkeepingApi;
use crate::config::PipelineConfig;
use crate::error::LedgerError;
use crate::invoice::InvoiceData;
use crate::plan::ApiCallPlan;
use crate::prompts::{planner_request, PLANNER_SYSTEM_PROMPT};
use crate::provider::{GenerateRequest, LlmProvider};
use crate::tools::planner_tools;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Fetch the registered counterparties, then plan.
///
/// The `GET /pessoas` happens first because its result is embedded in the
/// planning prompt.
pub async fn plan_invoice(
    provider: &dyn LlmProvider,
    backend: &dyn BookkeepingApi,
    invoice: &InvoiceData,
    config: &PipelineConfig,
) -> Result<ApiCallPlan, LedgerError> {
    let counterparties = backend
        .get("/pessoas")
        .await
        .map_err(|source| LedgerError::Backend {
            method: "GET".to_string(),
            endpoint: "/pessoas".to_string(),
            source,
        })?;
    debug!(
        "Fetched {} registered pessoas",
        counterparties.as_array().map_or(0, Vec::len)
    );

    plan_with_counterparties(provider, invoice, &counterparties, config).await
}

/// Ask the model for a plan given an already-fetched counterparty snapshot.
///
/// `counterparties` is the `/pessoas` response body, normally an array.
pub async fn plan_with_counterparties(
    provider: &dyn LlmProvider,
    invoice: &InvoiceData,
    counterparties: &Value,
    config: &PipelineConfig,
) -> Result<ApiCallPlan, LedgerError> {
    log_known_counterparties(invoice, counterparties);

    let system = config
        .planner_prompt
        .as_deref()
        .unwrap_or(PLANNER_SYSTEM_PROMPT);
    let user = planner_request(invoice, counterparties)
        .map_err(|e| LedgerError::Internal(format!("failed to serialise planner input: {e}")))?;

    let request = GenerateRequest::new()
        .system(system)
        .text(user)
        .tools(planner_tools())
        .temperature(config.temperature);

    let text = provider.generate(&request).await?;
    let plan = parse_plan(&text)?;

    info!(
        calls = plan.calls.len(),
        has_final_record = plan.final_record.is_some(),
        "Reconciliation plan received"
    );
    Ok(plan)
}

/// Strip code fences and parse the model's plan.
///
/// Only text that is not a JSON object fails; the contents of the object
/// are taken as the model wrote them (see [`ApiCallPlan`]).
pub fn parse_plan(text: &str) -> Result<ApiCallPlan, LedgerError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| plan_parse_error(e.to_string(), text))?;
    if !value.is_object() {
        return Err(plan_parse_error("expected a JSON object".to_string(), text));
    }
    serde_json::from_value(value).map_err(|e| plan_parse_error(e.to_string(), text))
}

fn plan_parse_error(reason: String, raw: &str) -> LedgerError {
    warn!("Failed to parse plan: {reason}");
    debug!("Raw plan response: {raw}");
    LedgerError::PlanParse {
        reason,
        raw: raw.to_string(),
    }
}

/// Log which invoice parties already appear in the snapshot.
///
/// Purely diagnostic: the model makes the actual decision.
fn log_known_counterparties(invoice: &InvoiceData, counterparties: &Value) {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let rows = counterparties.as_array().map(Vec::as_slice).unwrap_or_default();
    let find = |document: &str| {
        let wanted = digits(document);
        if wanted.is_empty() {
            return None;
        }
        rows.iter()
            .find(|row| {
                row.get("documento")
                    .and_then(Value::as_str)
                    .is_some_and(|own| digits(own) == wanted)
            })
            .and_then(|row| row.get("id").cloned())
    };
    debug!(
        supplier_id = ?find(&invoice.supplier.tax_id),
        customer_id = ?find(&invoice.customer.tax_id),
        "Local counterparty lookup"
    );
}
