//! Gatehouse server binary.
//!
//! Main application entry point that loads configuration, validates the
//! provider registry, selects a storage backend, and starts the HTTP server
//! with graceful shutdown.

use anyhow::Result;
use gatehouse::{
    config::Config,
    http::{AppState, build_router},
    oauth::ProviderRegistry,
    storage::{create_storage_backend, parse_storage_backend},
};
use std::{env, sync::Arc};

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gatehouse=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let version = gatehouse::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting gatehouse");

    let config = Config::new()?;

    // Fail fast on missing provider credentials: a partially configured
    // registry would silently disable one login path.
    let providers = Arc::new(ProviderRegistry::from_config(&config)?);

    let http_client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(*config.http_client_timeout.as_ref())
        .build()?;

    let storage_backend =
        parse_storage_backend(&config.storage_backend, config.database_url.as_deref())?;
    let storage = create_storage_backend(storage_backend).await?;

    let app_context = AppState::new(http_client, Arc::new(config.clone()), providers, storage);

    let app = build_router(app_context);

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    // Start HTTP server
    {
        let http_port = *config.http_port.as_ref();
        let inner_token = token.clone();
        tracker.spawn(async move {
            let bind_address = format!("0.0.0.0:{http_port}");
            tracing::info!("Starting server on {bind_address}");
            let listener = match TcpListener::bind(&bind_address).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind {bind_address}: {err}");
                    inner_token.cancel();
                    return;
                }
            };

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}
