//! The `serve` subcommand: run the proxy in front of the model provider.

use std::sync::Arc;

use tonal_api::{create_router, AppState, OpenAiUpstream};
use tonal_core::config::TonalConfig;

/// Bind the proxy and serve until Ctrl-C.
pub async fn run(config: &TonalConfig, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let upstream = OpenAiUpstream::new(config.upstream.clone())?;
    let state = AppState::new(Arc::new(upstream));
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind, is another instance running?");
            tracing::error!("Try: tonal serve --port {}", port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(
        addr = %addr,
        model = %config.upstream.chat_model,
        "Proxy listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
