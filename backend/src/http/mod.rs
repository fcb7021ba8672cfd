//! HTTP server module for the GeoInsight backend.
//!
//! This module provides an axum-based HTTP server that exposes the proxy
//! endpoints and comparison sessions as a REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - Parameter validation (400 naming the parameter)       │
//! │  - JSON / SSE / xlsx responses                           │
//! │  - CORS, compression, error envelope                     │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                               │
//! │  - Scene search, attribute fallback, geocoding           │
//! │  - Comparison pipeline and session tracker               │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Upstream Layer (upstream/)                              │
//! │  - HttpDataCubeClient / LocalDataCubeClient              │
//! └──────────────────────────────────────────────────────────┘
//! ```

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub use router::create_router;

#[cfg(feature = "http-server")]
pub use state::AppState;
