use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::app::{app_at, AppState};
use crate::auth::AuthGate;
use crate::config::{AppConfig, StoreBackend};
use crate::services;
use crate::store::{DocumentStore, MemoryStore, MongoStore};

#[derive(Parser)]
#[command(name = "erudite")]
#[command(about = "Erudite - rooms, equipment and disciplines registry")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Address to bind, overrides ERUDITE_HOST")]
        host: Option<String>,
        #[arg(long, help = "Port to bind, overrides ERUDITE_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Print the effective configuration as JSON")]
    Config,
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(config, &host, port).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Mongo => Arc::new(
            MongoStore::connect(&config.store)
                .await
                .context("failed to open MongoDB client")?,
        ),
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = services::ensure_indexes(&store).await {
        warn!("Could not ensure unique indexes: {}", e);
    }
    Ok(store)
}

async fn serve(config: &AppConfig, host: &str, port: u16) -> anyhow::Result<()> {
    info!("Starting Erudite in {:?} mode", config.environment);

    let store = open_store(config).await?;
    let gate = AuthGate::from_config(&config.auth).context("failed to set up authorization")?;
    let state = AppState::new(store.clone(), gate);
    let gate = state.gate.clone();

    let bind_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    let prefix = config.server.api_prefix.as_deref();
    info!("Erudite listening on http://{}{}", bind_addr, prefix.unwrap_or(""));

    axum::serve(listener, app_at(state, prefix))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down");
    gate.close().await;
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
}
