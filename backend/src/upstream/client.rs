//! The upstream client abstraction.
//!
//! Handlers and the comparison pipeline only see [`DataCubeClient`]; the
//! reqwest-backed and in-memory implementations are interchangeable.

use async_trait::async_trait;

use super::error::UpstreamResult;
use super::models::{
    CoverageDescription, GeocodePlace, StacItemCollection, StacSearchParams, TimeSeriesQuery,
    TimeSeriesResponse,
};

/// Operations the proxy needs from the Brazil Data Cube and the geocoder.
#[async_trait]
pub trait DataCubeClient: Send + Sync {
    /// Run one STAC item search page.
    async fn search_items(&self, params: &StacSearchParams) -> UpstreamResult<StacItemCollection>;

    /// Fetch the time series of one or more attributes of a coverage at a point.
    async fn time_series(&self, query: &TimeSeriesQuery) -> UpstreamResult<TimeSeriesResponse>;

    /// Describe a coverage (its attribute list in particular).
    async fn describe_coverage(&self, coverage: &str) -> UpstreamResult<CoverageDescription>;

    /// Resolve free text to candidate places, best match first.
    async fn geocode(&self, query: &str) -> UpstreamResult<Vec<GeocodePlace>>;
}
