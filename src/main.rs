// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Service entry point: load config from the environment, open the
//! registry, wire the engine components and serve the RPC endpoint
//! until SIGINT/SIGTERM.

use repo_replicator::config::EngineConfig;
use repo_replicator::host::GitHubClient;
use repo_replicator::orchestrator::ReplicationOrchestrator;
use repo_replicator::registry::RepositoryRegistry;
use repo_replicator::server::{self, AppState};
use repo_replicator::verifier::ConvergenceVerifier;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> repo_replicator::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(
        api_url = %config.host.api_url,
        db_path = %config.registry.sqlite_path,
        "starting repo-replicator"
    );

    let registry = Arc::new(RepositoryRegistry::new(&config.registry).await?);
    let client = Arc::new(GitHubClient::new(&config.host)?);

    let state = AppState {
        registry: Arc::clone(&registry),
        orchestrator: Arc::new(ReplicationOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&client),
            config.host.commit_page_size,
        )),
        verifier: Arc::new(ConvergenceVerifier::new(
            Arc::clone(&registry),
            Arc::clone(&client),
            config.host.commit_page_size,
        )),
    };

    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr)
        .await
        .map_err(|e| {
            repo_replicator::ReplicationError::Config(format!(
                "failed to bind {}: {e}",
                config.http.bind_addr
            ))
        })?;
    tracing::info!(addr = %config.http.bind_addr, "RPC endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| repo_replicator::ReplicationError::Internal(format!("server error: {e}")))?;

    registry.close().await;
    tracing::info!("repo-replicator shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
