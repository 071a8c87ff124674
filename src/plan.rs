//! Reconciliation plans produced by the planner and the results of running
//! them against the bookkeeping backend.

use crate::error::CallError;
use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// An ordered list of backend calls that reconciles and persists one invoice.
///
/// Calls must be applied in order: the final `POST /movimentos` depends on
/// IDs discovered or created by the calls before it.
///
/// Any JSON object deserialises into a plan. Missing or mistyped parts are
/// left empty and a call the executor cannot recognise is skipped there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiCallPlan {
    #[serde(default, deserialize_with = "calls")]
    pub calls: Vec<PlannedCall>,

    #[serde(rename = "ids", default, deserialize_with = "lenient::object")]
    pub resolved_ids: ResolvedIds,

    /// The movement payload to persist, including its installments.
    #[serde(
        rename = "finalMovimentoData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_record: Option<Value>,
}

/// One step of an [`ApiCallPlan`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    #[serde(default, deserialize_with = "lenient::text")]
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
}

/// HTTP method of a planned call.
///
/// The model is told to use only GET and POST; anything else it invents,
/// including a missing or non-string method, is `Unsupported` and skipped
/// by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    #[default]
    Unsupported,
}

impl HttpMethod {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            _ => HttpMethod::Unsupported,
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(name) => HttpMethod::from_name(&name),
            _ => HttpMethod::Unsupported,
        })
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Unsupported => "UNSUPPORTED",
        })
    }
}

/// IDs the model resolved from existing records.
///
/// Kept as raw JSON: for records an earlier call has yet to create the
/// model writes placeholders such as `"ID_FROM_CALL_1"` instead of a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIds {
    #[serde(rename = "fornecedorId", default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Value>,
    #[serde(rename = "faturadoId", default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Value>,
    #[serde(rename = "classificacaoId", default, skip_serializing_if = "Option::is_none")]
    pub classification_id: Option<Value>,
}

impl ResolvedIds {
    /// The supplier ID when the model gave a whole number.
    pub fn supplier(&self) -> Option<i64> {
        numeric_id(self.supplier_id.as_ref())
    }

    pub fn customer(&self) -> Option<i64> {
        numeric_id(self.customer_id.as_ref())
    }

    pub fn classification(&self) -> Option<i64> {
        numeric_id(self.classification_id.as_ref())
    }
}

/// `12`, `12.0` and `"12"` are IDs; placeholders and `null` are not.
fn numeric_id(value: Option<&Value>) -> Option<i64> {
    let n = lenient::to_f64(value?)?;
    (n.fract() == 0.0 && n >= 1.0 && n <= i64::MAX as f64).then_some(n as i64)
}

/// Elements that are not call objects become unrecognised calls so the
/// executor reports them as skipped; a non-array `calls` is no calls.
fn calls<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<PlannedCall>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// The outcome of one executed [`PlannedCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub endpoint: String,
    pub method: HttpMethod,
    pub description: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl CallResult {
    pub(crate) fn ok(call: &PlannedCall, data: Value) -> Self {
        Self {
            endpoint: call.endpoint.clone(),
            method: call.method,
            description: call.description.clone(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn failed(call: &PlannedCall, error: CallError) -> Self {
        Self {
            endpoint: call.endpoint.clone(),
            method: call.method,
            description: call.description.clone(),
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialises_model_plan() {
        let plan: ApiCallPlan = serde_json::from_value(json!({
            "calls": [
                {"endpoint": "/pessoas", "method": "GET", "data": null, "description": "Fetch pessoas"},
                {"endpoint": "/pessoas", "method": "POST", "data": {"tipo": "PJ"}, "description": "Create supplier"},
                {"endpoint": "/movimentos", "method": "POST", "description": "Create movement"}
            ],
            "ids": {"fornecedorId": 12, "faturadoId": null},
            "finalMovimentoData": {"tipo": "APAGAR", "valor_total": 10}
        }))
        .unwrap();

        assert_eq!(plan.calls.len(), 3);
        assert_eq!(plan.calls[0].method, HttpMethod::Get);
        assert!(plan.calls[0].payload.is_none());
        assert_eq!(plan.calls[1].payload, Some(json!({"tipo": "PJ"})));
        assert_eq!(plan.resolved_ids.supplier(), Some(12));
        assert_eq!(plan.resolved_ids.customer_id, None);
        assert!(plan.final_record.is_some());
    }

    #[test]
    fn unknown_method_is_kept_as_unsupported() {
        let call: PlannedCall = serde_json::from_value(json!({
            "endpoint": "/pessoas/1", "method": "DELETE", "description": "nope"
        }))
        .unwrap();
        assert_eq!(call.method, HttpMethod::Unsupported);
    }

    #[test]
    fn lowercase_methods_are_accepted() {
        let call: PlannedCall =
            serde_json::from_value(json!({"endpoint": "/pessoas", "method": "get"})).unwrap();
        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(call.description, "");
    }

    #[test]
    fn placeholder_ids_are_kept_verbatim() {
        let plan: ApiCallPlan = serde_json::from_value(json!({
            "calls": [],
            "ids": {"fornecedorId": "ID_FROM_CALL_1", "faturadoId": 12.0, "classificacaoId": null}
        }))
        .unwrap();
        assert_eq!(plan.resolved_ids.supplier_id, Some(json!("ID_FROM_CALL_1")));
        assert_eq!(plan.resolved_ids.supplier(), None);
        assert_eq!(plan.resolved_ids.customer(), Some(12));
        assert_eq!(plan.resolved_ids.classification_id, None);
    }

    #[test]
    fn null_calls_and_ids_are_an_empty_plan() {
        let plan: ApiCallPlan =
            serde_json::from_value(json!({"calls": null, "ids": null})).unwrap();
        assert_eq!(plan, ApiCallPlan::default());
    }

    #[test]
    fn incomplete_calls_are_kept_as_unrecognised() {
        let plan: ApiCallPlan = serde_json::from_value(json!({
            "calls": [
                {"method": "POST", "description": "no endpoint"},
                {"endpoint": "/pessoas"},
                {"endpoint": 42, "method": 7},
                "GET /pessoas"
            ]
        }))
        .unwrap();
        assert_eq!(plan.calls.len(), 4);
        assert_eq!(plan.calls[0].endpoint, "");
        assert_eq!(plan.calls[0].method, HttpMethod::Post);
        assert_eq!(plan.calls[1].method, HttpMethod::Unsupported);
        assert_eq!(plan.calls[2].endpoint, "42");
        assert_eq!(plan.calls[2].method, HttpMethod::Unsupported);
        assert_eq!(plan.calls[3], PlannedCall::default());
    }

    #[test]
    fn empty_object_is_an_empty_plan() {
        let plan: ApiCallPlan = serde_json::from_str("{}").unwrap();
        assert_eq!(plan, ApiCallPlan::default());
    }
}
