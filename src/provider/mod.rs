//! LLM provider abstraction.
//!
//! Both pipeline stages that talk to a model go through [`LlmProvider`], so
//! tests and embedders can swap the hosted API for anything that turns a
//! [`GenerateRequest`] into text. [`gemini::GeminiProvider`] is the only
//! network implementation.

pub mod gemini;

use crate::error::LedgerError;
use crate::tools::FunctionDeclaration;
use async_trait::async_trait;

pub use gemini::GeminiProvider;

/// One piece of user content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Base64 payload attached inline, e.g. the invoice PDF.
    InlineData { mime_type: String, data: String },
}

/// Everything a provider needs for a single generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub parts: Vec<Part>,
    /// Declarative tool schemas; never invoked.
    pub tools: Vec<FunctionDeclaration>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn inline_data(mut self, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        self.parts.push(Part::InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        });
        self
    }

    pub fn tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }
}

/// A hosted model that answers with free text.
///
/// Implementations must be `Send + Sync`; the pipeline holds them behind an
/// `Arc` and awaits one request at a time.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Send one request and return the first text part of the first
    /// candidate.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_parts_in_order() {
        let req = GenerateRequest::new()
            .system("sys")
            .text("prompt")
            .inline_data("application/pdf", "JVBERi0=")
            .temperature(Some(0.2));

        assert_eq!(req.system_instruction.as_deref(), Some("sys"));
        assert_eq!(req.parts.len(), 2);
        assert!(matches!(req.parts[0], Part::Text(ref t) if t == "prompt"));
        assert!(matches!(
            req.parts[1],
            Part::InlineData { ref mime_type, .. } if mime_type == "application/pdf"
        ));
        assert!(req.tools.is_empty());
    }
}
