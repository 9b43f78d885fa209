use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use architect_core::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Server configuration error: API Key missing")]
    MissingCredential,

    #[error("{0}")]
    Provider(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// The message that is allowed to cross to the client.
    pub fn public_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Internal Server Error".to_string()
        } else {
            message
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
