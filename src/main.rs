//! Dynamic upstream service.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  DYN-UPSTREAM                    │
//!                     │                                                  │
//!  GET /dynamic?..    │  ┌─────────┐    ┌───────────┐    ┌──────────┐    │
//!  ───────────────────┼─▶│  admin  │───▶│ operation │───▶│  engine  │    │
//!                     │  │ router  │    │ TryFrom   │    │ handlers │    │
//!                     │  └─────────┘    └───────────┘    └────┬─────┘    │
//!                     │                                       │ lock     │
//!                     │                                       ▼          │
//!                     │  ┌───────────────┐           ┌──────────────┐    │
//!                     │  │ load_balancer │──────────▶│    region    │    │
//!                     │  │  (reader)     │   lock    │ slab + arena │    │
//!                     │  └───────────────┘           │  + registry  │    │
//!                     │                              └──────────────┘    │
//!                     │                                       │          │
//!                     │                                       ▼          │
//!                     │                              ┌──────────────┐    │
//!                     │                              │    store     │    │
//!                     │                              │ (TOML file)  │    │
//!                     │                              └──────────────┘    │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tokio::net::TcpListener;

use dyn_upstream::admin::{setup_admin_router, AdminState};
use dyn_upstream::config::loader::load_config;
use dyn_upstream::config::GatewayConfig;
use dyn_upstream::lifecycle::{build_engine, shutdown_signal};
use dyn_upstream::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dyn-upstream")]
#[command(about = "Runtime-mutable upstream groups", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("dyn-upstream v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        upstreams = config.upstreams.len(),
        region_bytes = config.region.size_bytes,
        page_size = config.region.page_size,
        store_enabled = config.store.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let engine = Arc::new(build_engine(&config)?);

    if !config.admin.enabled {
        tracing::warn!("Admin API disabled; upstreams are fixed until restart");
        shutdown_signal().await;
        return Ok(());
    }

    let listener = TcpListener::bind(&config.admin.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        auth = config.admin.api_key.is_some(),
        "Admin API listening"
    );

    let router = setup_admin_router(AdminState::new(engine, config.admin.api_key.clone()));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
