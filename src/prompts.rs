//! Prompts for invoice extraction and reconciliation planning.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what the model is asked for
//!    requires editing exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    calling a real model, so prompt regressions are easy to catch.
//!
//! Callers can override either prompt via
//! [`crate::config::PipelineConfig::extraction_prompt`] and
//! [`crate::config::PipelineConfig::planner_prompt`]; the builders here are
//! used only when no override is provided.

use crate::invoice::{ExpenseCategory, InvoiceData};

/// JSON skeleton the extraction model must fill in.
const INVOICE_SCHEMA: &str = r#"{
  "fornecedor": {
    "razaoSocial": "string",
    "fantasia": "string",
    "cnpj": "string"
  },
  "faturado": {
    "nomeCompleto": "string",
    "cpfCnpj": "string"
  },
  "numeroNotaFiscal": "string",
  "dataEmissao": "YYYY-MM-DD",
  "produtos": [
    {
      "descricao": "string",
      "quantidade": number,
      "valorUnitario": number,
      "valorTotal": number
    }
  ],
  "quantidadeParcelas": 1,
  "parcelas": [
    {
      "numero": 1,
      "dataVencimento": "YYYY-MM-DD",
      "valor": number
    }
  ],
  "valorTotal": number,
  "classificacaoDespesa": {
    "categoria": "MAIN_CATEGORY",
    "subcategoria": "specific subcategory",
    "justificativa": "why this classification fits the products"
  }
}"#;

/// Build the default extraction instruction.
///
/// The category list is rendered from [`ExpenseCategory::ALL`] so the prompt
/// can never drift from the enum the response is deserialised into.
pub fn extraction_prompt() -> String {
    let categories = ExpenseCategory::ALL
        .iter()
        .map(|c| format!("{}: {}", c.as_str(), c.subcategories().join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert in Brazilian agricultural-sector invoices (NF-e). Analyse the attached PDF invoice and extract EXACTLY the following information, returning valid JSON:

{INVOICE_SCHEMA}

AVAILABLE EXPENSE CATEGORIES:
{categories}

IMPORTANT RULES:
1. For products that are not clearly identified use generic descriptions, but keep the JSON valid
2. For the expense classification, analyse the products and choose the most appropriate category
3. quantidadeParcelas must equal the number of entries in parcelas
4. Amounts must be numbers, not strings
5. Dates must use the YYYY-MM-DD format
6. RETURN ONLY THE JSON, WITHOUT ANY ADDITIONAL TEXT

Analyse the invoice and return the JSON:"#
    )
}

/// Default system instruction for the reconciliation planner.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are an agent that analyses NF-e invoice data and creates a PLAN of API calls to persist it.

YOUR TASK: Do NOT execute any API calls. Return a JSON object with the exact sequence of API calls needed.

STEPS TO FOLLOW:
1. SUPPLIER (fornecedor):
   - First call: GET /pessoas
   - Check whether it exists by CNPJ. If yes, note its ID. If not, plan POST /pessoas with {tipo: 'PJ', razaosocial, fantasia, documento}

2. CUSTOMER (faturado):
   - If the pessoas list was not fetched yet, call GET /pessoas
   - Check whether it exists by documento. Determine tipo: 'PF' for 11 digits, 'PJ' for 14 digits
   - If it does not exist, plan POST /pessoas with {tipo, razaosocial, documento}

3. CLASSIFICATION:
   - Call GET /classificacoes
   - Check whether an exact match exists (categoria + subcategoria + justificativa)
   - If not, plan POST /classificacoes with {tipo: categoria, descricao}

4. Always plan: POST /movimentos with the collected IDs and the invoice data

OUTPUT FORMAT - EXACTLY:
{
  "calls": [
    {
      "endpoint": "/pessoas",
      "method": "GET",
      "data": null,
      "description": "Fetch existing pessoas"
    },
    {
      "endpoint": "/pessoas",
      "method": "POST",
      "data": { ... },
      "description": "Create new supplier"
    }
  ],
  "ids": {
    "fornecedorId": 123,
    "faturadoId": 456,
    "classificacaoId": 789
  },
  "finalMovimentoData": { ... }
}

Return ONLY valid JSON. No explanations."#;

/// Build the user turn for a planning request.
///
/// Serialisation failures cannot happen for these plain data types, but the
/// function stays fallible so the caller decides how to surface one.
pub fn planner_request(
    invoice: &InvoiceData,
    counterparties: &serde_json::Value,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "Analyze this invoice and return the API call plan: {} here are the existing pessoas: {}, \
         remember to use them to avoid duplicates and return the id of the existing ones.",
        serde_json::to_string(invoice)?,
        serde_json::to_string(counterparties)?
    ))
}
