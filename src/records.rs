//! Entities persisted by the bookkeeping backend.
//!
//! These mirror the backend's JSON (snake_case, Portuguese column names).
//! The crate only reads them; creation payloads are produced by the planner
//! and forwarded verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Natural person (CPF) or legal entity (CNPJ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonKind {
    #[serde(rename = "PF")]
    Natural,
    #[serde(rename = "PJ")]
    Legal,
}

impl PersonKind {
    /// `PF`/`PJ` in any case. The backend column is free text, so other
    /// values are possible and yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PF" => Some(PersonKind::Natural),
            "PJ" => Some(PersonKind::Legal),
            _ => None,
        }
    }

    /// Infer the kind from a CPF/CNPJ: 11 digits is a person, 14 an entity.
    ///
    /// Punctuation is ignored. Any other digit count is ambiguous.
    pub fn from_document(document: &str) -> Option<Self> {
        match document.chars().filter(char::is_ascii_digit).count() {
            11 => Some(PersonKind::Natural),
            14 => Some(PersonKind::Legal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Natural => "PF",
            PersonKind::Legal => "PJ",
        }
    }
}

/// A supplier or customer (`pessoas`).
///
/// `tipo` is a `VARCHAR` in the backend and is kept as written; use
/// [`Pessoa::kind`] for the interpreted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pessoa {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub razaosocial: Option<String>,
    #[serde(default)]
    pub fantasia: Option<String>,
    #[serde(default)]
    pub documento: Option<String>,
    #[serde(default)]
    pub ativo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Pessoa {
    /// The declared kind, or the one implied by the document when `tipo`
    /// is neither `PF` nor `PJ`.
    pub fn kind(&self) -> Option<PersonKind> {
        PersonKind::from_code(&self.tipo)
            .or_else(|| self.documento.as_deref().and_then(PersonKind::from_document))
    }

    /// Whether `document` names this counterparty, ignoring punctuation.
    pub fn matches_document(&self, document: &str) -> bool {
        let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
        match self.documento.as_deref() {
            Some(own) => {
                let own = digits(own);
                !own.is_empty() && own == digits(document)
            }
            None => false,
        }
    }
}

/// An expense classification (`classificacoes`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classificacao {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub tipo: String,
    pub descricao: String,
    #[serde(default)]
    pub ativo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A financial movement derived from one invoice (`movimentos`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movimento {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub tipo: String,
    #[serde(default)]
    pub numero_notafiscal: Option<String>,
    #[serde(default)]
    pub data_emissao: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(with = "numeric")]
    pub valor_total: f64,
    #[serde(default)]
    pub id_fornecedorcliente: Option<i64>,
    #[serde(default)]
    pub id_faturado: Option<i64>,
    #[serde(default)]
    pub ativo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One scheduled payment owned by a [`Movimento`] (`parcelas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcela {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub id_movimento: i64,
    #[serde(default)]
    pub identificacao: Option<String>,
    #[serde(default)]
    pub data_vencimento: Option<String>,
    #[serde(default, with = "numeric_opt")]
    pub valor_parcela: Option<f64>,
    #[serde(default, with = "numeric_opt")]
    pub valor_pago: Option<f64>,
    #[serde(default, with = "numeric_opt")]
    pub valor_saldo: Option<f64>,
    #[serde(default)]
    pub status_parcela: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Postgres `NUMERIC` columns arrive as JSON strings (`"1500.00"`) from
/// the reference backend, but as numbers from others. Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid numeric value '{s}'"))),
        }
    }
}

mod numeric {
    use super::NumberOrString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(*v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        NumberOrString::deserialize(d)?.into_f64()
    }
}

mod numeric_opt {
    use super::NumberOrString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => s.serialize_some(n),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Option::<NumberOrString>::deserialize(d)?
            .map(NumberOrString::into_f64)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn person_kind_from_document_length() {
        assert_eq!(PersonKind::from_document("123.456.789-01"), Some(PersonKind::Natural));
        assert_eq!(
            PersonKind::from_document("12.345.678/0001-90"),
            Some(PersonKind::Legal)
        );
        assert_eq!(PersonKind::from_document("123"), None);
    }

    #[test]
    fn pessoa_deserialises_backend_row() {
        let p: Pessoa = serde_json::from_value(json!({
            "id": 7,
            "tipo": "PJ",
            "razaosocial": "Agro Ltda",
            "fantasia": null,
            "documento": "12345678000190",
            "ativo": true,
            "created_at": "2025-01-10T12:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(p.id, Some(7));
        assert_eq!(p.kind(), Some(PersonKind::Legal));
        assert!(p.created_at.is_some());
        assert!(p.matches_document("12.345.678/0001-90"));
        assert!(!p.matches_document("98765432000100"));
    }

    #[test]
    fn pessoa_without_document_never_matches() {
        let p: Pessoa = serde_json::from_value(json!({
            "tipo": "PF", "razaosocial": "Maria"
        }))
        .unwrap();
        assert!(!p.matches_document(""));
    }

    #[test]
    fn free_text_tipo_and_null_name_are_accepted() {
        let p: Pessoa = serde_json::from_value(json!({
            "id": 9, "tipo": "FORNECEDOR", "razaosocial": null, "documento": "123.456.789-01"
        }))
        .unwrap();
        assert_eq!(p.tipo, "FORNECEDOR");
        assert_eq!(p.razaosocial, None);
        assert_eq!(p.kind(), Some(PersonKind::Natural));

        let p: Pessoa = serde_json::from_value(json!({"tipo": "pj"})).unwrap();
        assert_eq!(p.kind(), Some(PersonKind::Legal));
    }

    #[test]
    fn numeric_columns_accept_strings_and_numbers() {
        let m: Movimento = serde_json::from_value(json!({
            "id": 1, "tipo": "APAGAR", "valor_total": "1500.50"
        }))
        .unwrap();
        assert_eq!(m.valor_total, 1500.5);

        let p: Parcela = serde_json::from_value(json!({
            "id_movimento": 1, "valor_parcela": 750, "valor_pago": "0.00", "valor_saldo": null
        }))
        .unwrap();
        assert_eq!(p.valor_parcela, Some(750.0));
        assert_eq!(p.valor_pago, Some(0.0));
        assert_eq!(p.valor_saldo, None);
    }
}
