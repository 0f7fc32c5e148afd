use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use rssmerge::api::{create_router, AppState};
use rssmerge::config::Config;

#[derive(Parser, Debug)]
#[command(name = "rssmerge", about = "Merge many RSS/Atom feeds into one", version)]
struct Args {
    /// Path to the TOML config file (optional; defaults are used when absent)
    #[arg(long, value_name = "FILE", default_value = "rssmerge.toml")]
    config: PathBuf,

    /// Listen address, overriding `bind` from the config file
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let addr = config.bind;
    let state = AppState::new(config).context("Failed to build HTTP client")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
