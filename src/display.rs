//! Human-readable rendering of invoices, plans and execution results.
//!
//! Formatting follows Brazilian conventions: `R$ 1.234,56`, `DD/MM/YYYY`,
//! masked CNPJ/CPF. Output is plain text; the CLI adds colour on top.

use crate::invoice::InvoiceData;
use crate::plan::{ApiCallPlan, CallResult};
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt::Write as _;

/// Shown in place of blank dates and names.
pub const NOT_INFORMED: &str = "Não informado";

fn digits(document: &str) -> String {
    document.chars().filter(char::is_ascii_digit).collect()
}

/// `12345678000190` → `12.345.678/0001-90`. Anything that is not 14 digits
/// is returned unchanged.
pub fn format_cnpj(document: &str) -> String {
    let d = digits(document);
    if d.len() != 14 {
        return document.to_string();
    }
    format!("{}.{}.{}/{}-{}", &d[0..2], &d[2..5], &d[5..8], &d[8..12], &d[12..14])
}

/// `12345678901` → `123.456.789-01`. Anything that is not 11 digits is
/// returned unchanged.
pub fn format_cpf(document: &str) -> String {
    let d = digits(document);
    if d.len() != 11 {
        return document.to_string();
    }
    format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
}

/// Pick CPF or CNPJ masking by digit count.
pub fn format_document(document: &str) -> String {
    match digits(document).len() {
        11 => format_cpf(document),
        14 => format_cnpj(document),
        _ if document.trim().is_empty() => NOT_INFORMED.to_string(),
        _ => document.to_string(),
    }
}

/// pt-BR currency: `1234.5` → `R$ 1.234,50`.
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

/// `2024-03-15` → `15/03/2024`. Blank input yields [`NOT_INFORMED`];
/// unparseable input is returned unchanged.
pub fn format_date(date: &str) -> String {
    let date = date.trim();
    if date.is_empty() {
        return NOT_INFORMED.to_string();
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn or_not_informed(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_INFORMED
    } else {
        value
    }
}

/// Multi-line summary of an extracted invoice.
pub fn render_invoice(invoice: &InvoiceData) -> String {
    let mut out = String::new();
    let supplier = &invoice.supplier;

    let _ = writeln!(out, "Nota Fiscal {}", or_not_informed(&invoice.invoice_number));
    let _ = writeln!(out, "  Emissão:     {}", format_date(&invoice.issue_date));
    let _ = writeln!(out, "  Fornecedor:  {}", or_not_informed(&supplier.legal_name));
    if let Some(trade) = supplier.trade_name.as_deref().filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(out, "               ({trade})");
    }
    let _ = writeln!(out, "  CNPJ:        {}", format_document(&supplier.tax_id));
    let _ = writeln!(out, "  Faturado:    {}", or_not_informed(&invoice.customer.full_name));
    let _ = writeln!(out, "  CPF/CNPJ:    {}", format_document(&invoice.customer.tax_id));
    let _ = writeln!(out, "  Valor total: {}", format_brl(invoice.total_amount));

    let class = &invoice.expense_classification;
    let label = class.category.map_or(NOT_INFORMED, |c| c.label());
    let _ = write!(out, "  Categoria:   {label}");
    match class.subcategory.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(sub) => {
            let _ = writeln!(out, " / {sub}");
        }
        None => out.push('\n'),
    }
    if !class.justification.trim().is_empty() {
        let _ = writeln!(out, "  Motivo:      {}", class.justification);
    }

    if !invoice.line_items.is_empty() {
        let _ = writeln!(out, "\nProdutos ({})", invoice.line_items.len());
        for item in &invoice.line_items {
            let qty = item
                .quantity
                .map(|q| format!("{q} × "))
                .unwrap_or_default();
            let total = item.total_price.map(format_brl).unwrap_or_default();
            let _ = writeln!(out, "  - {qty}{}  {total}", or_not_informed(&item.description));
        }
    }

    let _ = writeln!(out, "\nParcelas ({})", invoice.installment_count);
    for inst in &invoice.installments {
        let _ = writeln!(
            out,
            "  {:>2}. {}  {}",
            inst.number,
            format_date(&inst.due_date),
            format_brl(inst.amount)
        );
    }

    out
}

/// Numbered list of planned calls plus the IDs the planner resolved.
pub fn render_plan(plan: &ApiCallPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plano de execução ({} chamadas)", plan.calls.len());
    for (i, call) in plan.calls.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<4} {}  {}",
            i + 1,
            call.method,
            call.endpoint,
            call.description
        );
    }

    let ids = &plan.resolved_ids;
    let _ = writeln!(out, "  Fornecedor:   {}", fmt_id(ids.supplier(), ids.supplier_id.as_ref()));
    let _ = writeln!(out, "  Faturado:     {}", fmt_id(ids.customer(), ids.customer_id.as_ref()));
    let _ = writeln!(
        out,
        "  Classificação: {}",
        fmt_id(ids.classification(), ids.classification_id.as_ref())
    );
    if plan.final_record.is_none() {
        let _ = writeln!(out, "  (sem finalMovimentoData)");
    }
    out
}

/// A resolved ID, the model's placeholder for one still to be created, or
/// "a criar" when it gave nothing.
fn fmt_id(numeric: Option<i64>, raw: Option<&Value>) -> String {
    match (numeric, raw) {
        (Some(id), _) => id.to_string(),
        (None, Some(Value::String(placeholder))) if !placeholder.trim().is_empty() => {
            format!("a criar ({placeholder})")
        }
        _ => "a criar".to_string(),
    }
}

/// One line per attempted call with ✓/✗ and the error for failures.
pub fn render_results(results: &[CallResult]) -> String {
    let mut out = String::new();
    let succeeded = results.iter().filter(|r| r.success).count();
    let _ = writeln!(out, "Resultados: {succeeded}/{} com sucesso", results.len());
    for r in results {
        let mark = if r.success { "✓" } else { "✗" };
        let _ = write!(out, "  {mark} {:<4} {}", r.method, r.endpoint);
        match &r.error {
            Some(e) => {
                let _ = writeln!(out, "  {e}");
            }
            None => out.push('\n'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::invoice::ExpenseCategory;
    use crate::plan::{HttpMethod, PlannedCall};

    #[test]
    fn masks_documents() {
        assert_eq!(format_cnpj("12345678000190"), "12.345.678/0001-90");
        assert_eq!(format_cpf("12345678901"), "123.456.789-01");
        assert_eq!(format_document("123.456.789-01"), "123.456.789-01");
        assert_eq!(format_document("12345678000190"), "12.345.678/0001-90");
        assert_eq!(format_document("abc"), "abc");
        assert_eq!(format_document(""), NOT_INFORMED);
    }

    #[test]
    fn formats_brl() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(999.999), "R$ 1.000,00");
        assert_eq!(format_brl(-12.5), "-R$ 12,50");
    }

    #[test]
    fn formats_dates() {
        assert_eq!(format_date("2024-03-15"), "15/03/2024");
        assert_eq!(format_date("  "), NOT_INFORMED);
        assert_eq!(format_date("15/03/2024"), "15/03/2024");
    }

    #[test]
    fn every_category_has_a_label() {
        for category in ExpenseCategory::ALL {
            assert!(!category.label().is_empty(), "{category} has no label");
        }
    }

    #[test]
    fn results_show_failures() {
        let call = PlannedCall {
            endpoint: "/pessoas".into(),
            method: HttpMethod::Post,
            payload: None,
            description: "create".into(),
        };
        let results = vec![
            CallResult::ok(&call, serde_json::json!({"id": 1})),
            CallResult::failed(
                &call,
                CallError::Rejected {
                    status: 409,
                    message: "duplicate".into(),
                },
            ),
        ];
        let text = render_results(&results);
        assert!(text.contains("1/2"));
        assert!(text.contains("✗ POST /pessoas"));
        assert!(text.contains("duplicate"));
    }

    #[test]
    fn plan_shows_resolved_ids_and_placeholders() {
        let plan: ApiCallPlan = serde_json::from_value(serde_json::json!({
            "calls": [{"endpoint": "/pessoas", "method": "POST", "description": "Create supplier"}],
            "ids": {"fornecedorId": "ID_FROM_CALL_1", "faturadoId": 3.0}
        }))
        .unwrap();
        let text = render_plan(&plan);
        assert!(text.contains("POST /pessoas"));
        assert!(text.contains("Fornecedor:   a criar (ID_FROM_CALL_1)"));
        assert!(text.contains("Faturado:     3\n"));
        assert!(text.contains("Classificação: a criar\n"));
        assert!(text.contains("sem finalMovimentoData"));
    }
}
