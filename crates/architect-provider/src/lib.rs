pub mod engine;

use async_trait::async_trait;

pub use engine::LlmProvider;

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// One generation call against the external model service.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub system_instruction: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Build(String),

    #[error("{0}")]
    Request(String),
}

/// A text generation backend. `Ok(None)` means the call succeeded but the
/// model produced no text.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, request: ProviderRequest<'_>) -> Result<Option<String>, ProviderError>;
}
