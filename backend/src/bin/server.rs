//! GeoInsight HTTP Server Binary
//!
//! This is the main entry point for the GeoInsight REST API server.
//! It loads the configuration, builds the upstream client, sets up the HTTP
//! router, and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! # Against the live Brazil Data Cube services (default)
//! cargo run --bin geoinsight-server
//!
//! # With in-memory sample data
//! UPSTREAM_MODE=local cargo run --bin geoinsight-server
//! ```
//!
//! # Environment Variables
//!
//! - `GEOINSIGHT_CONFIG`: Path to a TOML configuration file
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3000)
//! - `UPSTREAM_MODE`: `http` or `local`
//! - `BDC_STAC_URL`, `BDC_WTSS_URL`, `GEOCODER_URL`: Upstream base URLs
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoinsight::config::AppConfig;
use geoinsight::http::{create_router, AppState};
use geoinsight::upstream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting GeoInsight HTTP Server");

    let config = AppConfig::load()?;
    info!(
        stac = %config.stac.base_url,
        wtss = %config.wtss.base_url,
        mode = %config.server.upstream_mode,
        "Configuration loaded"
    );

    let client = upstream::create_client(&config)?;
    let addr = config.bind_address();

    let state = AppState::new(client, config);
    let app = create_router(state);

    // Host names such as `localhost` are resolved by the listener
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    info!("Server listening on http://{}", local);
    info!("Health check: http://{}/health", local);

    axum::serve(listener, app).await?;

    Ok(())
}
