//! # GeoInsight Backend
//!
//! Proxy and time-series comparison engine for the Brazil Data Cube.
//!
//! This crate sits between a map-based browser frontend and INPE's Brazil
//! Data Cube services: it forwards catalog (STAC) and time-series (WTSS)
//! queries with light transformation, and runs multi-collection comparisons
//! whose aligned results are served as chart data or an xlsx workbook.
//!
//! ## Features
//!
//! - **Scene search**: point-to-bbox STAC search over the WTSS-compatible cubes
//! - **Attribute discovery**: coverage descriptions with a fallback table for known upstream 404s
//! - **Comparisons**: throttled sequential fetching, scale normalization and timeline alignment
//! - **Export**: one spreadsheet tab per attribute
//! - **HTTP API**: RESTful endpoints for frontend integration
//!
//! ## Architecture
//!
//! - [`api`]: Domain types shared across layers
//! - [`config`]: TOML and environment configuration
//! - [`upstream`]: Clients for the external services
//! - [`services`]: Business logic and the comparison pipeline
//! - [`http`]: Axum-based HTTP server and request handlers

pub mod api;

pub mod config;

pub mod upstream;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
