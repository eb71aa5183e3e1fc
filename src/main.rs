mod config;
mod error;
mod fabric;
mod flow;
mod gemini;
mod generative;
mod logging;
mod models;
mod pipeline;
mod render;
mod routes;
mod schema;
mod suit_design;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::gemini::GeminiClient;
use crate::generative::{DemoModel, GenerativeModel};
use crate::pipeline::DesignPipeline;
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    logging::init_logging(settings.env);

    let model: Arc<dyn GenerativeModel> = if settings.demo_mode() {
        tracing::warn!("GEMINI_API_KEY not set - serving canned demo designs");
        Arc::new(DemoModel)
    } else {
        let key_hint: String = settings.gemini_api_key.chars().take(6).collect();
        tracing::info!("Using API key: {}...", key_hint);
        Arc::new(GeminiClient::from_settings(&settings).context("failed to build Gemini client")?)
    };
    tracing::info!(model = model.name(), "Generative model ready");

    let shutdown = CancellationToken::new();
    let state = AppState {
        pipeline: DesignPipeline::new(model, Duration::from_secs(settings.generation_timeout_seconds)),
        shutdown: shutdown.clone(),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown requested, cancelling in-flight submissions");
    shutdown.cancel();
}
