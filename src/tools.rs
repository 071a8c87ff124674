//! Function-style tool schemas declared to the planner model.
//!
//! These are descriptive metadata only. The model is asked to return a plan
//! as text and never invokes a tool, so nothing here is dispatchable: each
//! declaration is a name, a description and an OpenAPI-subset parameter
//! schema, serialised into the `tools` array of the request.

use crate::invoice::ExpenseCategory;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single function declaration in Gemini's `function_declarations` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDeclaration {
    fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

fn no_parameters() -> Value {
    json!({ "type": "OBJECT", "properties": {}, "required": [] })
}

/// The five declarations sent with every planning request.
pub fn planner_tools() -> Vec<FunctionDeclaration> {
    let categories: Vec<&str> = ExpenseCategory::ALL.iter().map(|c| c.as_str()).collect();

    vec![
        FunctionDeclaration::new(
            "get_pessoas",
            "Retrieve the list of all registered pessoas to check for existing suppliers or customers.",
            no_parameters(),
        ),
        FunctionDeclaration::new(
            "create_pessoa",
            "Create a new pessoa (supplier or customer) if not already registered. \
             Use type 'PJ' for suppliers and 'PF' or 'PJ' for customers based on the document length.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "tipo": {
                        "type": "STRING",
                        "description": "Type of pessoa: 'PF' for natural person, 'PJ' for legal entity.",
                        "enum": ["PF", "PJ"]
                    },
                    "razaosocial": { "type": "STRING", "description": "Legal name." },
                    "fantasia": { "type": "STRING", "description": "Trade name (PJ only)." },
                    "documento": { "type": "STRING", "description": "CPF or CNPJ, digits only." }
                },
                "required": ["tipo", "documento"]
            }),
        ),
        FunctionDeclaration::new(
            "get_classificacoes",
            "Retrieve the list of all registered classificacoes to check for an existing expense classification.",
            no_parameters(),
        ),
        FunctionDeclaration::new(
            "create_classificacao",
            "Create a new classificacao if no exact match is already registered.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "tipo": {
                        "type": "STRING",
                        "description": "Category of the expense.",
                        "enum": categories
                    },
                    "descricao": { "type": "STRING", "description": "Description of the expense." }
                },
                "required": ["descricao", "tipo"]
            }),
        ),
        FunctionDeclaration::new(
            "create_movimento",
            "Always create a new movimento with the invoice details, using the IDs of the pessoas and the classificacao.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "idFornecedor": { "type": "NUMBER", "description": "ID of the supplier pessoa." },
                    "idFaturado": { "type": "NUMBER", "description": "ID of the customer pessoa." },
                    "numeroNotaFiscal": { "type": "STRING", "description": "Invoice number." },
                    "dataEmissao": { "type": "STRING", "description": "Issue date." },
                    "produtos": {
                        "type": "ARRAY",
                        "description": "List of products.",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "descricao": { "type": "STRING" },
                                "quantidade": { "type": "NUMBER" },
                                "valorUnitario": { "type": "NUMBER" },
                                "valorTotal": { "type": "NUMBER" }
                            }
                        }
                    },
                    "quantidadeParcelas": { "type": "NUMBER", "description": "Number of installments." },
                    "parcelas": {
                        "type": "ARRAY",
                        "description": "List of installments.",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "numero": { "type": "NUMBER" },
                                "dataVencimento": { "type": "STRING" },
                                "valor": { "type": "NUMBER" }
                            }
                        }
                    },
                    "valorTotal": { "type": "NUMBER", "description": "Total value." },
                    "idClassificacao": { "type": "NUMBER", "description": "ID of the classificacao." }
                },
                "required": [
                    "idFornecedor", "idFaturado", "numeroNotaFiscal", "dataEmissao", "produtos",
                    "quantidadeParcelas", "parcelas", "valorTotal", "idClassificacao"
                ]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_five_tools_in_order() {
        let names: Vec<String> = planner_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "get_pessoas",
                "create_pessoa",
                "get_classificacoes",
                "create_classificacao",
                "create_movimento"
            ]
        );
    }

    #[test]
    fn classification_enum_lists_every_category() {
        let tools = planner_tools();
        let enum_values = tools[3].parameters["properties"]["tipo"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(enum_values.len(), ExpenseCategory::ALL.len());
        assert!(enum_values.contains(&json!("SEGUROS_E_PROTECAO")));
    }

    #[test]
    fn every_declaration_has_an_object_schema() {
        for tool in planner_tools() {
            assert_eq!(tool.parameters["type"], "OBJECT", "{}", tool.name);
            assert!(!tool.description.is_empty());
        }
    }
}
