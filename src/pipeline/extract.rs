//! Invoice extraction: encoded PDF → model → validated [`InvoiceData`].
//!
//! The model is asked for bare JSON but routinely adds prose around it, so
//! the response goes through three gates before an `InvoiceData` exists:
//!
//! 1. locate the first balanced `{...}` ([`super::json::first_json_object`])
//! 2. parse it as JSON and check the two fields nothing works without
//!    (`fornecedor` as an object, a non-blank `numeroNotaFiscal`)
//! 3. deserialise into the typed model and, in strict mode, run
//!    [`InvoiceData::validate`]
//!
//! Every other field is taken as the model wrote it: mistyped scalars are
//! coerced and unreadable ones fall back to defaults, so the third gate
//! only rejects anything in strict mode.
//!
//! Any failure aborts extraction; a partially extracted invoice is never
//! returned.

use super::encode::EncodedDocument;
use super::json::first_json_object;
use crate::config::PipelineConfig;
use crate::error::LedgerError;
use crate::invoice::InvoiceData;
use crate::prompts::extraction_prompt;
use crate::provider::{GenerateRequest, LlmProvider};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

/// Send `document` to the model and return the extracted invoice.
///
/// Not idempotent: the same document may yield different values on
/// repeated calls.
pub async fn extract_invoice(
    provider: &dyn LlmProvider,
    document: &EncodedDocument,
    config: &PipelineConfig,
) -> Result<InvoiceData, LedgerError> {
    let start = Instant::now();
    let prompt = config
        .extraction_prompt
        .clone()
        .unwrap_or_else(extraction_prompt);

    let request = GenerateRequest::new()
        .text(prompt)
        .inline_data(document.mime_type, document.data.as_str())
        .temperature(config.temperature);

    let text = provider.generate(&request).await?;
    debug!(
        "Extraction response: {} chars in {:?}",
        text.len(),
        start.elapsed()
    );

    let invoice = parse_invoice(&text, config.strict_validation)?;
    info!(
        invoice = %invoice.invoice_number,
        category = invoice
            .expense_classification
            .category
            .map_or("unclassified", |c| c.as_str()),
        "Invoice extracted"
    );
    Ok(invoice)
}

/// Turn raw model text into a validated invoice.
///
/// Kept separate from the network call so every gate is testable with
/// canned responses.
pub fn parse_invoice(text: &str, strict: bool) -> Result<InvoiceData, LedgerError> {
    let json = first_json_object(text)
        .ok_or_else(|| LedgerError::parse("no JSON object found in the response"))?;

    let value: Value =
        serde_json::from_str(json).map_err(|e| LedgerError::parse(format!("invalid JSON: {e}")))?;

    let supplier = value.get("fornecedor");
    if is_absent(supplier) {
        return Err(LedgerError::validation("supplier (fornecedor) is missing"));
    }
    if !matches!(supplier, Some(Value::Object(_))) {
        return Err(LedgerError::validation(
            "supplier (fornecedor) is not an object",
        ));
    }
    if is_absent(value.get("numeroNotaFiscal")) {
        return Err(LedgerError::validation(
            "invoice number (numeroNotaFiscal) is missing",
        ));
    }

    let invoice: InvoiceData = serde_json::from_value(value)
        .map_err(|e| LedgerError::parse(format!("unexpected invoice shape: {e}")))?;

    if strict {
        let issues = invoice.validate();
        if !issues.is_empty() {
            return Err(LedgerError::validation(issues.join("; ")));
        }
    }

    Ok(invoice)
}

/// Missing, `null`, `false` and empty strings all count as absent.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn body(extra: &str) -> String {
        format!(
            r#"{{"fornecedor":{{"razaoSocial":"Agro Ltda","fantasia":"Agro","cnpj":"12345678000190"}},
               "faturado":{{"nomeCompleto":"João","cpfCnpj":"12345678901"}},
               "numeroNotaFiscal":"123","dataEmissao":"2024-03-15",
               "produtos":[{{"descricao":"Ureia","quantidade":2,"valorUnitario":50,"valorTotal":100}}],
               "quantidadeParcelas":1,
               "parcelas":[{{"numero":1,"dataVencimento":"2024-04-15","valor":100}}],
               "valorTotal":100,
               "classificacaoDespesa":{{"categoria":"INSUMOS_AGRICOLAS","subcategoria":"Fertilizantes","justificativa":"ureia"}}{extra}}}"#
        )
    }

    #[test]
    fn extracts_invoice_number_from_prose() {
        let text = format!("Here is the data: {}", body(""));
        let invoice = parse_invoice(&text, true).unwrap();
        assert_eq!(invoice.invoice_number, "123");
        assert_eq!(invoice.supplier.tax_id, "12345678000190");
    }

    #[test]
    fn no_object_is_a_parse_error() {
        let err = parse_invoice("Sorry, the PDF is unreadable.", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_invoice("{fornecedor: nope}", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn missing_supplier_is_a_validation_error() {
        let err = parse_invoice(r#"{"numeroNotaFiscal":"123"}"#, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("fornecedor"));
    }

    #[test]
    fn missing_invoice_number_is_a_validation_error() {
        let err = parse_invoice(r#"{"fornecedor":{"cnpj":"1"},"numeroNotaFiscal":""}"#, true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("numeroNotaFiscal"));
    }

    #[test]
    fn installment_mismatch_fails_only_in_strict_mode() {
        let text = body("").replace(r#""quantidadeParcelas":1"#, r#""quantidadeParcelas":3"#);
        let err = parse_invoice(&text, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let invoice = parse_invoice(&text, false).unwrap();
        assert_eq!(invoice.installment_count, 3);
        assert_eq!(invoice.installments.len(), 1);
    }

    #[test]
    fn unknown_extra_fields_are_ignored() {
        let invoice = parse_invoice(&body(r#","observacoes":"x""#), true).unwrap();
        assert_eq!(invoice.total_amount, 100.0);
    }

    #[test]
    fn scalar_supplier_is_a_validation_error() {
        let err = parse_invoice(r#"{"fornecedor":"Agro Ltda","numeroNotaFiscal":"1"}"#, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("not an object"));
    }

    #[test]
    fn mistyped_fields_are_trusted_in_lenient_mode() {
        let text = body("")
            .replace(r#""numeroNotaFiscal":"123""#, r#""numeroNotaFiscal":123"#)
            .replace(r#""quantidade":2"#, r#""quantidade":"10""#)
            .replace(r#""quantidadeParcelas":1"#, r#""quantidadeParcelas":null"#)
            .replace(r#""valorTotal":100,"#, r#""valorTotal":"100,00","#);
        let invoice = parse_invoice(&text, false).unwrap();
        assert_eq!(invoice.invoice_number, "123");
        assert_eq!(invoice.line_items[0].quantity, Some(10.0));
        assert_eq!(invoice.installment_count, 1);
        assert_eq!(invoice.total_amount, 100.0);
    }

    #[test]
    fn missing_classification_passes_only_in_lenient_mode() {
        let text = body("").replace(
            r#""classificacaoDespesa":{"categoria":"INSUMOS_AGRICOLAS","subcategoria":"Fertilizantes","justificativa":"ureia"}"#,
            r#""observacoes":"sem classificacao""#,
        );
        let invoice = parse_invoice(&text, false).unwrap();
        assert_eq!(invoice.expense_classification.category, None);

        let err = parse_invoice(&text, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("classificacaoDespesa"));
    }

    #[test]
    fn is_absent_covers_null_false_and_blank() {
        assert!(is_absent(None));
        assert!(is_absent(Some(&Value::Null)));
        assert!(is_absent(Some(&Value::String("  ".into()))));
        assert!(!is_absent(Some(&serde_json::json!({}))));
        assert!(!is_absent(Some(&Value::String("0".into()))));
    }
}
