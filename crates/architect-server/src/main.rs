use std::sync::Arc;

use architect_provider::LlmProvider;
use architect_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = ServerConfig::from_env()?;

    // The key is looked up per request; only warn here.
    if config.credential.resolve().is_none() {
        log::warn!(
            "{} is not set; /api/generate will answer 500 until it is",
            config.credential.env_var_name().unwrap_or("provider API key")
        );
    }

    let state = Arc::new(AppState::new(&config, Arc::new(LlmProvider::new())));
    let app = build_router(state, config.static_dir.as_deref());

    if let Some(dir) = &config.static_dir {
        log::info!("serving static files from {}", dir.display());
    }

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    log::info!(
        "Server running on http://localhost:{} (model {})",
        listener.local_addr()?.port(),
        config.model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("shutting down");
        })
        .await?;
    Ok(())
}
