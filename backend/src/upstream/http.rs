//! reqwest implementation of [`DataCubeClient`].

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::client::DataCubeClient;
use super::error::{Service, UpstreamError, UpstreamResult};
use super::models::{
    CoverageDescription, GeocodePlace, StacItemCollection, StacSearchParams, TimeSeriesQuery,
    TimeSeriesResponse,
};
use crate::config::AppConfig;

/// Client for the live STAC, WTSS and geocoder endpoints.
///
/// Each service gets its own reqwest client so timeouts and headers stay per service.
pub struct HttpDataCubeClient {
    stac: Client,
    wtss: Client,
    geocoder: Client,
    stac_url: Url,
    wtss_url: Url,
    geocoder_url: Url,
}

impl HttpDataCubeClient {
    pub fn new(config: &AppConfig) -> UpstreamResult<Self> {
        let user_agent = concat!("geoinsight/", env!("CARGO_PKG_VERSION"));
        Ok(Self {
            stac: build_client(config.stac.timeout_secs, user_agent)?,
            wtss: build_client(config.wtss.timeout_secs, user_agent)?,
            geocoder: build_client(config.geocoder.timeout_secs, &config.geocoder.user_agent)?,
            stac_url: parse_base("stac.base_url", &config.stac.base_url)?,
            wtss_url: parse_base("wtss.base_url", &config.wtss.base_url)?,
            geocoder_url: parse_base("geocoder.base_url", &config.geocoder.base_url)?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: Service,
        client: &Client,
        url: Url,
        query: &[(&str, String)],
    ) -> UpstreamResult<T> {
        debug!("{} GET {} {:?}", service, url, query);
        let response = client.get(url.clone()).query(query).send().await.map_err(|e| {
            let err = UpstreamError::transport(service, e);
            warn!("{} request to {} failed: {} (params: {:?})", service, url, err, query);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "{} answered {} for {} (params: {:?}): {}",
                service, status, url, query, body
            );
            return Err(UpstreamError::status(service, status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(service, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("{} payload from {} did not parse: {}", service, url, e);
            UpstreamError::decode(service, e)
        })
    }
}

#[async_trait]
impl DataCubeClient for HttpDataCubeClient {
    async fn search_items(&self, params: &StacSearchParams) -> UpstreamResult<StacItemCollection> {
        let url = join(&self.stac_url, &["search"])?;
        self.get_json(Service::Stac, &self.stac, url, &params.to_query())
            .await
    }

    async fn time_series(&self, query: &TimeSeriesQuery) -> UpstreamResult<TimeSeriesResponse> {
        let url = join(&self.wtss_url, &["time_series"])?;
        self.get_json(Service::Wtss, &self.wtss, url, &query.to_query())
            .await
    }

    async fn describe_coverage(&self, coverage: &str) -> UpstreamResult<CoverageDescription> {
        let url = join(&self.wtss_url, &[coverage])?;
        self.get_json(Service::Wtss, &self.wtss, url, &[]).await
    }

    async fn geocode(&self, query: &str) -> UpstreamResult<Vec<GeocodePlace>> {
        let params = [
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", "1".to_string()),
        ];
        self.get_json(
            Service::Geocoder,
            &self.geocoder,
            self.geocoder_url.clone(),
            &params,
        )
        .await
    }
}

fn build_client(timeout_secs: u64, user_agent: &str) -> UpstreamResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .map_err(|e| UpstreamError::Configuration(format!("failed to build HTTP client: {}", e)))
}

fn parse_base(name: &str, raw: &str) -> UpstreamResult<Url> {
    Url::parse(raw.trim()).map_err(|e| {
        UpstreamError::Configuration(format!("{} '{}' is not a URL: {}", name, raw, e))
    })
}

/// Append path segments to a base URL, percent-encoding each segment.
fn join(base: &Url, segments: &[&str]) -> UpstreamResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::Configuration(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
