//! Upstream service access.
//!
//! This module wraps the external services the proxy forwards to behind the
//! [`DataCubeClient`] trait, allowing the live HTTP client and an in-memory
//! client to be swapped.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers / comparison pipeline                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  DataCubeClient trait (client.rs)                       │
//! └──────────┬─────────────────────────────┬────────────────┘
//!            │                             │
//! ┌──────────▼──────────────┐   ┌──────────▼──────────────┐
//! │  HttpDataCubeClient     │   │  LocalDataCubeClient    │
//! │  (reqwest, live BDC)    │   │  (in-memory fixtures)   │
//! └─────────────────────────┘   └─────────────────────────┘
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod local;
pub mod models;

pub use client::DataCubeClient;
pub use error::{Service, UpstreamError, UpstreamResult};
pub use http::HttpDataCubeClient;
pub use local::LocalDataCubeClient;
pub use models::{
    CoverageDescription, GeocodePlace, StacItem, StacItemCollection, StacSearchParams,
    TimeSeriesAttribute, TimeSeriesQuery, TimeSeriesResponse, TimeSeriesResult,
};

use std::str::FromStr;
use std::sync::Arc;

use crate::config::AppConfig;

/// Which [`DataCubeClient`] implementation to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// Live services over HTTP
    Http,
    /// In-memory sample data
    Local,
}

impl FromStr for UpstreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "live" => Ok(Self::Http),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown upstream mode: {}", s)),
        }
    }
}

/// Create the client selected by `server.upstream_mode`.
pub fn create_client(config: &AppConfig) -> UpstreamResult<Arc<dyn DataCubeClient>> {
    let mode = config
        .server
        .upstream_mode
        .parse::<UpstreamMode>()
        .map_err(UpstreamError::Configuration)?;
    Ok(match mode {
        UpstreamMode::Http => Arc::new(HttpDataCubeClient::new(config)?),
        UpstreamMode::Local => Arc::new(LocalDataCubeClient::with_sample_data()),
    })
}
