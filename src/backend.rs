//! Client for the bookkeeping ("financeiro") REST backend.
//!
//! [`BookkeepingApi`] exposes raw JSON `get`/`post` so plan execution can
//! forward model-produced payloads verbatim, plus typed list helpers for the
//! reads the crate itself needs. [`HttpBookkeeping`] is the reqwest
//! implementation.

use crate::error::CallError;
use crate::records::{Classificacao, Movimento, Parcela, Pessoa};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default backend root.
pub const DEFAULT_BACKEND_URL: &str = "https://express-tarefa.onrender.com/api/financeiro";

/// The bookkeeping REST API.
///
/// Paths are relative to the backend root, e.g. `/pessoas`.
#[async_trait]
pub trait BookkeepingApi: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, CallError>;

    async fn post(&self, path: &str, body: &Value) -> Result<Value, CallError>;

    /// `GET /pessoas`
    async fn list_pessoas(&self) -> Result<Vec<Pessoa>, CallError> {
        decode(self.get("/pessoas").await?)
    }

    /// `GET /classificacoes`
    async fn list_classificacoes(&self) -> Result<Vec<Classificacao>, CallError> {
        decode(self.get("/classificacoes").await?)
    }

    /// `GET /movimentos`
    async fn list_movimentos(&self) -> Result<Vec<Movimento>, CallError> {
        decode(self.get("/movimentos").await?)
    }

    /// `GET /movimentos/{id}/parcelas`
    async fn list_parcelas(&self, id_movimento: i64) -> Result<Vec<Parcela>, CallError> {
        decode(self.get(&format!("/movimentos/{id_movimento}/parcelas")).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, CallError> {
    serde_json::from_value(value).map_err(|e| CallError::InvalidResponse {
        reason: e.to_string(),
    })
}

/// reqwest-backed [`BookkeepingApi`].
#[derive(Debug, Clone)]
pub struct HttpBookkeeping {
    client: Client,
    base_url: String,
}

impl HttpBookkeeping {
    pub fn new(base_url: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self, CallError> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| CallError::Transport {
            reason: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read(response: reqwest::Response) -> Result<Value, CallError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Rejected {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown status").to_string()
                } else {
                    body
                },
            });
        }

        let bytes = response.bytes().await.map_err(|e| CallError::Transport {
            reason: e.to_string(),
        })?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| CallError::InvalidResponse {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl BookkeepingApi for HttpBookkeeping {
    async fn get(&self, path: &str) -> Result<Value, CallError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CallError::Transport {
                reason: e.to_string(),
            })?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, CallError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport {
                reason: e.to_string(),
            })?;
        Self::read(response).await
    }
}
