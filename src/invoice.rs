//! Canonical extracted representation of one invoice.
//!
//! Field names are English in Rust, but the serialised keys are the
//! Portuguese keys the extraction prompt asks the model to emit, so the model
//! output deserialises directly into [`InvoiceData`].
//!
//! The model is not a reliable schema validator. Only the supplier block
//! and the invoice number are required; every other field accepts `null`,
//! a missing key or a mistyped scalar and falls back to its default.
//! [`InvoiceData::validate`] is where the remaining consistency rules live.

use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One extracted invoice. Immutable once produced by the extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    #[serde(rename = "fornecedor")]
    pub supplier: Supplier,

    #[serde(rename = "faturado", default, deserialize_with = "lenient::object")]
    pub customer: Customer,

    /// Kept as text even when the model emits a number.
    #[serde(rename = "numeroNotaFiscal", deserialize_with = "lenient::text")]
    pub invoice_number: String,

    /// ISO `YYYY-MM-DD` as produced by the model; not parsed.
    #[serde(rename = "dataEmissao", default, deserialize_with = "lenient::text")]
    pub issue_date: String,

    #[serde(rename = "produtos", default, deserialize_with = "lenient::list")]
    pub line_items: Vec<LineItem>,

    #[serde(
        rename = "quantidadeParcelas",
        default = "one",
        deserialize_with = "installment_count"
    )]
    pub installment_count: u32,

    #[serde(rename = "parcelas", default, deserialize_with = "lenient::list")]
    pub installments: Vec<Installment>,

    #[serde(rename = "valorTotal", default, deserialize_with = "lenient::number")]
    pub total_amount: f64,

    #[serde(
        rename = "classificacaoDespesa",
        default,
        deserialize_with = "lenient::object"
    )]
    pub expense_classification: ExpenseClassification,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(rename = "razaoSocial", default, deserialize_with = "lenient::text")]
    pub legal_name: String,

    #[serde(rename = "fantasia", default, deserialize_with = "lenient::opt_text")]
    pub trade_name: Option<String>,

    #[serde(rename = "cnpj", default, deserialize_with = "lenient::text")]
    pub tax_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "nomeCompleto", default, deserialize_with = "lenient::text")]
    pub full_name: String,

    #[serde(rename = "cpfCnpj", default, deserialize_with = "lenient::text")]
    pub tax_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "descricao", default, deserialize_with = "lenient::text")]
    pub description: String,

    #[serde(
        rename = "quantidade",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<f64>,

    #[serde(
        rename = "valorUnitario",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_price: Option<f64>,

    #[serde(
        rename = "valorTotal",
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    #[serde(rename = "numero", default, deserialize_with = "lenient::count")]
    pub number: u32,

    #[serde(rename = "dataVencimento", default, deserialize_with = "lenient::text")]
    pub due_date: String,

    #[serde(rename = "valor", default, deserialize_with = "lenient::number")]
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseClassification {
    /// `None` when the model left the category out or named one that is
    /// not in [`ExpenseCategory::ALL`].
    #[serde(rename = "categoria", default, deserialize_with = "category")]
    pub category: Option<ExpenseCategory>,

    #[serde(
        rename = "subcategoria",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub subcategory: Option<String>,

    #[serde(rename = "justificativa", default, deserialize_with = "lenient::text")]
    pub justification: String,
}

/// The nine fixed expense categories the model may choose from.
///
/// This enum is the single source of truth for the category list: the
/// extraction prompt, the planner tool schema and the terminal renderer all
/// iterate [`ExpenseCategory::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    InsumosAgricolas,
    ManutencaoEOperacao,
    RecursosHumanos,
    ServicosOperacionais,
    InfraestruturaEUtilidades,
    Administrativas,
    SegurosEProtecao,
    ImpostosETaxas,
    Investimentos,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 9] = [
        ExpenseCategory::InsumosAgricolas,
        ExpenseCategory::ManutencaoEOperacao,
        ExpenseCategory::RecursosHumanos,
        ExpenseCategory::ServicosOperacionais,
        ExpenseCategory::InfraestruturaEUtilidades,
        ExpenseCategory::Administrativas,
        ExpenseCategory::SegurosEProtecao,
        ExpenseCategory::ImpostosETaxas,
        ExpenseCategory::Investimentos,
    ];

    /// Wire identifier, e.g. `INSUMOS_AGRICOLAS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::InsumosAgricolas => "INSUMOS_AGRICOLAS",
            ExpenseCategory::ManutencaoEOperacao => "MANUTENCAO_E_OPERACAO",
            ExpenseCategory::RecursosHumanos => "RECURSOS_HUMANOS",
            ExpenseCategory::ServicosOperacionais => "SERVICOS_OPERACIONAIS",
            ExpenseCategory::InfraestruturaEUtilidades => "INFRAESTRUTURA_E_UTILIDADES",
            ExpenseCategory::Administrativas => "ADMINISTRATIVAS",
            ExpenseCategory::SegurosEProtecao => "SEGUROS_E_PROTECAO",
            ExpenseCategory::ImpostosETaxas => "IMPOSTOS_E_TAXAS",
            ExpenseCategory::Investimentos => "INVESTIMENTOS",
        }
    }

    /// Look up a category by its wire identifier, ignoring case and
    /// surrounding whitespace.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Human-readable label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::InsumosAgricolas => "Insumos Agrícolas",
            ExpenseCategory::ManutencaoEOperacao => "Manutenção e Operação",
            ExpenseCategory::RecursosHumanos => "Recursos Humanos",
            ExpenseCategory::ServicosOperacionais => "Serviços Operacionais",
            ExpenseCategory::InfraestruturaEUtilidades => "Infraestrutura e Utilidades",
            ExpenseCategory::Administrativas => "Administrativas",
            ExpenseCategory::SegurosEProtecao => "Seguros e Proteção",
            ExpenseCategory::ImpostosETaxas => "Impostos e Taxas",
            ExpenseCategory::Investimentos => "Investimentos",
        }
    }

    /// Subcategories the model is allowed to pick within this category.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            ExpenseCategory::InsumosAgricolas => &[
                "Sementes",
                "Fertilizantes",
                "Defensivos Agrícolas",
                "Corretivos",
            ],
            ExpenseCategory::ManutencaoEOperacao => &[
                "Combustíveis e Lubrificantes",
                "Peças, Parafusos, Componentes Mecânicos",
                "Manutenção de Máquinas e Equipamentos",
                "Pneus, Filtros, Correias",
                "Ferramentas e Utensílios",
            ],
            ExpenseCategory::RecursosHumanos => &["Mão de Obra Temporária", "Salários e Encargos"],
            ExpenseCategory::ServicosOperacionais => &[
                "Frete e Transporte",
                "Colheita Terceirizada",
                "Secagem e Armazenagem",
                "Pulverização e Aplicação",
            ],
            ExpenseCategory::InfraestruturaEUtilidades => &[
                "Energia Elétrica",
                "Arrendamento de Terras",
                "Construções e Reformas",
                "Materiais de Construção",
            ],
            ExpenseCategory::Administrativas => &[
                "Honorários (Contábeis, Advocatícios, Agronômicos)",
                "Despesas Bancárias e Financeiras",
            ],
            ExpenseCategory::SegurosEProtecao => &[
                "Seguro Agrícola",
                "Seguro de Ativos (Máquinas/Veículos)",
                "Seguro Prestamista",
            ],
            ExpenseCategory::ImpostosETaxas => &["ITR, IPTU, IPVA, INCRA-CCIR"],
            ExpenseCategory::Investimentos => &[
                "Aquisição de Máquinas e Implementos",
                "Aquisição de Veículos",
                "Aquisição de Imóveis",
                "Infraestrutura Rural",
            ],
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InvoiceData {
    /// Check the consistency rules the model is not trusted to honour.
    ///
    /// Returns every violation found, not just the first, so a single error
    /// message can list them all.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.installment_count == 0 {
            issues.push("quantidadeParcelas must be at least 1".to_string());
        }
        if self.installments.len() != self.installment_count as usize {
            issues.push(format!(
                "quantidadeParcelas is {} but {} parcelas were listed",
                self.installment_count,
                self.installments.len()
            ));
        }
        if self.total_amount < 0.0 {
            issues.push(format!("valorTotal is negative ({})", self.total_amount));
        }
        for (i, item) in self.line_items.iter().enumerate() {
            let fields = [
                ("quantidade", item.quantity),
                ("valorUnitario", item.unit_price),
                ("valorTotal", item.total_price),
            ];
            for (name, value) in fields {
                if matches!(value, Some(v) if v < 0.0) {
                    issues.push(format!("produtos[{i}].{name} is negative"));
                }
            }
        }
        for inst in &self.installments {
            if inst.amount < 0.0 {
                issues.push(format!("parcela {} has a negative valor", inst.number));
            }
        }
        if self.expense_classification.category.is_none() {
            issues.push("classificacaoDespesa.categoria is missing or unknown".to_string());
        }

        issues
    }

    /// Sum of installment amounts, handy for display and sanity checks.
    pub fn installments_total(&self) -> f64 {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

fn one() -> u32 {
    1
}

/// An explicit `null` or unreadable count means the same as a missing one.
fn installment_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(lenient::to_u32(&Value::deserialize(d)?).unwrap_or_else(one))
}

fn category<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ExpenseCategory>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(code) => ExpenseCategory::from_code(&code),
        _ => None,
    })
}
