//! Google Gemini `generateContent` client.
//!
//! Speaks the REST wire format directly with reqwest: the document travels as
//! an `inline_data` part, tool schemas as `function_declarations`, and the
//! answer is read from `candidates[0].content.parts[*].text`.

use super::{GenerateRequest, LlmProvider, Part};
use crate::error::LedgerError;
use crate::tools::FunctionDeclaration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const PROVIDER_NAME: &str = "gemini";

/// Gemini text provider.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider that posts to `endpoint` (a full `:generateContent`
    /// URL).
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, LedgerError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LedgerError::ProviderNotConfigured {
                provider: PROVIDER_NAME.to_string(),
                hint: "Set GEMINI_API_KEY or pass --api-key.".to_string(),
            });
        }

        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| LedgerError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint URL for `model` on the public API.
    pub fn endpoint_for_model(model: &str) -> String {
        format!("{GEMINI_API_BASE}/models/{model}:generateContent")
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(request: &GenerateRequest) -> GenerateContentRequest<'_> {
        let parts = request
            .parts
            .iter()
            .map(|p| match p {
                Part::Text(text) => ContentPart::Text { text },
                Part::InlineData { mime_type, data } => ContentPart::InlineData {
                    inline_data: InlineData { mime_type, data },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            system_instruction: request.system_instruction.as_deref().map(|text| SystemInstruction {
                parts: vec![ContentPart::Text { text }],
            }),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(vec![ToolBlock {
                    function_declarations: &request.tools,
                }])
            },
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, LedgerError> {
        let body = Self::build_body(request);

        debug!(
            endpoint = %self.endpoint,
            parts = request.parts.len(),
            tools = request.tools.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            let detail = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %detail, "Gemini API error body");
            return Err(LedgerError::Provider {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                message: reason.to_string(),
            });
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| LedgerError::EmptyResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: format!("failed to decode response: {e}"),
            })?;

        if let Some(usage) = &api_response.usage_metadata {
            debug!(
                input_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini usage"
            );
        }

        api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| LedgerError::EmptyResponse {
                provider: PROVIDER_NAME.to_string(),
                detail: "no candidate text in response".to_string(),
            })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolBlock<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolBlock<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
