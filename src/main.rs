//! Leadboard Server
//!
//! Run with: cargo run --bin leadboard
//!
//! # Configuration
//!
//! Read from `--config`, or the first of `~/.config/leadboard/config.toml`,
//! `/etc/leadboard/config.toml` and `./config.toml`, then overridden by
//! environment:
//! - `LEADBOARD_STORE_URL` / `SUPABASE_URL`: Project URL
//! - `LEADBOARD_STORE_KEY` / `SUPABASE_ANON_KEY`: Anonymous key
//! - `LEADBOARD_REFRESH_POLICY`: `full_reload` or `delta_patch`
//! - `LEADBOARD_HOST`, `LEADBOARD_PORT`: Bind address
//! - `RUST_LOG`: Log filter (default from `[logging]`)
//!
//! Without both store values the dashboard runs without persistence.

use clap::Parser;
use std::path::PathBuf;

use leadboard::api::{serve, ApiConfig, AppState};
use leadboard::config::Config;
use leadboard::dashboard::DashboardController;
use leadboard::{logging, store};

#[derive(Parser)]
#[command(name = "leadboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lead pipeline dashboard server")]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Config loading logs before the configured subscriber exists
    let mut config = logging::with_bootstrap(|| Config::resolve(args.config.as_deref()))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logging::init(&config.logging);
    tracing::info!("Starting Leadboard v{}", env!("CARGO_PKG_VERSION"));

    // Opened once for the whole process; None means no persistence
    let store = if config.store.is_configured() {
        store::connect_with(config.store.to_supabase())
    } else {
        tracing::info!("Store not configured (set LEADBOARD_STORE_URL and LEADBOARD_STORE_KEY to enable)");
        None
    };

    let controller = DashboardController::new(store, config.dashboard.controller());
    controller.mount().await;

    let api_config = ApiConfig::from(&config.server);
    tracing::info!(
        "Starting server on {}:{} (refresh policy: {:?})",
        api_config.host,
        api_config.port,
        controller.policy()
    );
    let result = serve(AppState::new(controller.clone(), api_config.clone()), &api_config).await;

    tracing::info!("Releasing change subscription...");
    controller.unmount().await;

    result?;
    tracing::info!("Leadboard stopped");
    Ok(())
}
