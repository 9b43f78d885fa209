use async_trait::async_trait;

use architect_core::api::{ErrorResponse, GenerateRequest, GenerateResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The proxy answered with a non-success status.
    #[error("{0}")]
    Server(String),

    /// The request never completed or the answer could not be read.
    #[error("Failed to generate prompt. Please try again.")]
    Transport,
}

/// Turns a composed prompt into generated text. One attempt per call.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, GenerationError>;
}

/// Talks to the proxy's `/api/generate`.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for HttpGenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Error generating prompt: {e}");
                GenerationError::Transport
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .map(|body| body.error)
                .filter(|error| !error.is_empty())
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            log::error!("Error generating prompt ({status}): {message}");
            return Err(GenerationError::Server(message));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            log::error!("Error generating prompt: unreadable response: {e}");
            GenerationError::Transport
        })?;
        Ok(body.text)
    }
}
