//! Stateless proxy between the Prompt Architect app and the model provider.
//!
//! The app never holds the provider key. It posts the composed prompt and
//! system instruction to `/api/generate`; this server attaches the key,
//! calls the provider and relays the text or a sanitized error.

pub mod config;
pub mod error;

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::services::ServeDir;

use architect_core::api::{
    ErrorResponse, GenerateRequest, GenerateResponse, HealthResponse, NO_RESPONSE_TEXT,
};
use architect_provider::{Provider, ProviderRequest};

pub use config::{ConfigError, CredentialSource, ServerConfig};
pub use error::ProxyError;

pub type SharedState = Arc<AppState>;

/// Read-only state shared by every request.
pub struct AppState {
    pub credential: CredentialSource,
    pub model: String,
    pub provider: Arc<dyn Provider>,
}

impl AppState {
    pub fn new(config: &ServerConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            credential: config.credential.clone(),
            model: config.model.clone(),
            provider,
        }
    }
}

pub fn build_router(state: SharedState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/generate",
            post(generate).fallback(method_not_allowed),
        )
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method Not Allowed".to_string(),
        }),
    )
}

async fn generate(
    State(state): State<SharedState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ProxyError> {
    let Some(api_key) = state.credential.resolve() else {
        log::error!(
            "{} is missing",
            state.credential.env_var_name().unwrap_or("provider API key")
        );
        return Err(ProxyError::MissingCredential);
    };

    let result = state
        .provider
        .generate(ProviderRequest {
            api_key: &api_key,
            model: &state.model,
            prompt: &request.prompt,
            system_instruction: &request.system_instruction,
        })
        .await;

    match result {
        Ok(text) => Ok(Json(GenerateResponse {
            text: text.unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()),
        })),
        Err(e) => {
            log::error!("API Error: {e:?}");
            Err(ProxyError::Provider(e.to_string()))
        }
    }
}
