use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use crate::{Provider, ProviderError, ProviderRequest};

/// Google Gemini through the `llm` crate. A client is built per call so
/// every request authenticates with the key it was given.
#[derive(Debug, Clone, Default)]
pub struct LlmProvider;

impl LlmProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for LlmProvider {
    async fn generate(&self, request: ProviderRequest<'_>) -> Result<Option<String>, ProviderError> {
        let llm = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(request.api_key)
            .model(request.model)
            .system(request.system_instruction)
            .build()
            .map_err(|e| ProviderError::Build(format!("build LLM: {e}")))?;

        let messages = vec![ChatMessage::user().content(request.prompt).build()];

        log::debug!(
            "sending {} prompt chars to {}",
            request.prompt.len(),
            request.model
        );

        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(non_empty(response.text()))
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}
