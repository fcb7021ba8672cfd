//! In-memory implementation of [`DataCubeClient`].
//!
//! Serves catalog items, time series, coverage descriptions and places from
//! fixtures registered at runtime. Failures can be scripted per operation and
//! every call is recorded, which lets tests assert call order.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use super::client::DataCubeClient;
use super::error::{Service, UpstreamError, UpstreamResult};
use super::models::{
    CoverageAttribute, CoverageDescription, GeocodePlace, NumberOrText, StacItem,
    StacItemCollection, StacProperties, StacSearchParams, TimeSeriesAttribute, TimeSeriesQuery,
    TimeSeriesResponse, TimeSeriesResult,
};
use crate::api::iso_date_prefix;

type SeriesKey = (String, String);

#[derive(Default)]
struct LocalState {
    items: Vec<StacItem>,
    series: HashMap<SeriesKey, Vec<(String, Option<f64>)>>,
    coverages: HashMap<String, Vec<String>>,
    places: HashMap<String, Vec<GeocodePlace>>,
    search_failure: Option<(u16, String)>,
    series_failures: HashMap<SeriesKey, (u16, String)>,
    coverage_failures: HashMap<String, (u16, String)>,
    geocode_failure: Option<(u16, String)>,
}

/// Fixture-backed client for tests and offline development.
#[derive(Default)]
pub struct LocalDataCubeClient {
    state: RwLock<LocalState>,
    calls: Mutex<Vec<String>>,
}

impl LocalDataCubeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client preloaded with a small Jacareí (SP) scene set and NDVI/EVI series.
    pub fn with_sample_data() -> Self {
        let client = Self::new();
        let items = [
            ("S2-16D_V2_034018_20240101", "S2-16D-2", "2024-01-01", Some(25.8)),
            ("S2-16D_V2_034018_20240117", "S2-16D-2", "2024-01-17", Some(10.1)),
            ("LANDSAT-16D_V1_044052_20240101", "LANDSAT-16D-1", "2024-01-01", Some(5.2)),
            ("CB4-16D_V2_007011_20240102", "CB4-16D-2", "2024-01-02", None),
        ];
        for (id, collection, date, cloud_cover) in items {
            let datetime = format!("{}T00:00:00Z", date);
            client.add_item(sample_item(id, collection, &datetime, cloud_cover));
        }

        client.add_series(
            "S2-16D-2",
            "NDVI",
            &[
                ("2024-01-01", Some(6512.0)),
                ("2024-01-17", Some(7020.0)),
                ("2024-02-02", None),
            ],
        );
        client.add_series(
            "S2-16D-2",
            "EVI",
            &[
                ("2024-01-01", Some(3810.0)),
                ("2024-01-17", Some(4102.0)),
                ("2024-02-02", Some(3990.0)),
            ],
        );
        client.add_series(
            "LANDSAT-16D-1",
            "NDVI",
            &[("2024-01-01", Some(6120.0)), ("2024-01-17", Some(6644.0))],
        );
        client.add_series(
            "LANDSAT-16D-1",
            "EVI",
            &[("2024-01-01", Some(3500.0)), ("2024-01-17", None)],
        );
        client.add_series(
            "CB4-16D-2",
            "NDVI",
            &[("2024-01-02", Some(5870.0)), ("2024-01-18", Some(6210.0))],
        );

        client.add_coverage("LANDSAT-16D-1", &["blue", "green", "red", "nir08", "NDVI", "EVI"]);
        client.add_coverage("CB4-16D-2", &["BAND13", "BAND14", "BAND15", "BAND16", "NDVI", "EVI"]);
        client.fail_coverage("S2-16D-2", 404, "coverage not found");

        client.add_place(
            "Jacareí, SP",
            GeocodePlace {
                lat: NumberOrText::Text("-23.3054".into()),
                lon: NumberOrText::Text("-45.9659".into()),
                display_name: concat!(
                    "Jacareí, Região Metropolitana do Vale do Paraíba e Litoral Norte, ",
                    "São Paulo, Brasil"
                )
                .into(),
            },
        );
        client
    }

    pub fn add_item(&self, item: StacItem) {
        self.state.write().items.push(item);
    }

    /// Register the observations of one attribute of one coverage.
    pub fn add_series(&self, coverage: &str, attribute: &str, points: &[(&str, Option<f64>)]) {
        let points = points
            .iter()
            .map(|(date, value)| (date.to_string(), *value))
            .collect();
        self.state
            .write()
            .series
            .insert(series_key(coverage, attribute), points);
    }

    pub fn add_coverage(&self, coverage: &str, attributes: &[&str]) {
        self.state.write().coverages.insert(
            coverage.to_string(),
            attributes.iter().map(|a| a.to_string()).collect(),
        );
    }

    pub fn add_place(&self, query: &str, place: GeocodePlace) {
        self.state
            .write()
            .places
            .entry(normalize_query(query))
            .or_default()
            .push(place);
    }

    pub fn fail_search(&self, status: u16, body: &str) {
        self.state.write().search_failure = Some((status, body.to_string()));
    }

    pub fn fail_time_series(&self, coverage: &str, attribute: &str, status: u16, body: &str) {
        self.state
            .write()
            .series_failures
            .insert(series_key(coverage, attribute), (status, body.to_string()));
    }

    pub fn fail_coverage(&self, coverage: &str, status: u16, body: &str) {
        self.state
            .write()
            .coverage_failures
            .insert(coverage.to_string(), (status, body.to_string()));
    }

    pub fn fail_geocode(&self, status: u16, body: &str) {
        self.state.write().geocode_failure = Some((status, body.to_string()));
    }

    /// Calls received so far, e.g. `time_series S2-16D-2 NDVI`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DataCubeClient for LocalDataCubeClient {
    async fn search_items(&self, params: &StacSearchParams) -> UpstreamResult<StacItemCollection> {
        self.record(format!(
            "search_items {}",
            params
                .collections
                .as_ref()
                .map(|c| c.join(","))
                .unwrap_or_else(|| "*".to_string())
        ));
        let state = self.state.read();
        if let Some((status, body)) = &state.search_failure {
            return Err(UpstreamError::status(Service::Stac, *status, body.clone()));
        }

        let features: Vec<StacItem> = state
            .items
            .iter()
            .filter(|item| match &params.collections {
                Some(collections) => item
                    .collection
                    .as_ref()
                    .is_some_and(|c| collections.contains(c)),
                None => true,
            })
            .filter(|item| {
                item.bounding_box()
                    .map_or(true, |bbox| bbox.intersects(&params.bbox))
            })
            .take(params.limit as usize)
            .cloned()
            .collect();

        let mut collection = StacItemCollection::empty();
        collection.context = Some(serde_json::json!({
            "returned": features.len(),
            "limit": params.limit,
        }));
        collection.features = features;
        Ok(collection)
    }

    async fn time_series(&self, query: &TimeSeriesQuery) -> UpstreamResult<TimeSeriesResponse> {
        self.record(format!(
            "time_series {} {}",
            query.coverage,
            query.attributes.join(",")
        ));
        let state = self.state.read();

        let mut found = Vec::with_capacity(query.attributes.len());
        for attribute in &query.attributes {
            let key = series_key(&query.coverage, attribute);
            if let Some((status, body)) = state.series_failures.get(&key) {
                return Err(UpstreamError::status(Service::Wtss, *status, body.clone()));
            }
            match state.series.get(&key) {
                Some(points) => found.push((attribute.clone(), points)),
                None => {
                    return Err(UpstreamError::status(
                        Service::Wtss,
                        404,
                        format!(
                            "attribute {} not found in coverage {}",
                            attribute, query.coverage
                        ),
                    ))
                }
            }
        }

        // All attributes of a coverage share the timeline of the first one requested.
        let timeline: Vec<String> = found
            .first()
            .map(|(_, points)| {
                points
                    .iter()
                    .map(|(date, _)| date.clone())
                    .filter(|date| query.window.contains(date))
                    .collect()
            })
            .unwrap_or_default();

        let attributes = found
            .into_iter()
            .map(|(attribute, points)| {
                let lookup: HashMap<&str, Option<f64>> = points
                    .iter()
                    .map(|(date, value)| (iso_date_prefix(date), *value))
                    .collect();
                TimeSeriesAttribute {
                    attribute,
                    values: timeline
                        .iter()
                        .map(|date| lookup.get(iso_date_prefix(date)).copied().flatten())
                        .collect(),
                }
            })
            .collect();

        Ok(TimeSeriesResponse {
            query: serde_json::json!({
                "coverage": query.coverage,
                "attributes": query.attributes,
                "latitude": query.point.latitude,
                "longitude": query.point.longitude,
            }),
            result: TimeSeriesResult {
                attributes,
                timeline,
                coordinates: serde_json::json!({
                    "latitude": query.point.latitude,
                    "longitude": query.point.longitude,
                }),
            },
        })
    }

    async fn describe_coverage(&self, coverage: &str) -> UpstreamResult<CoverageDescription> {
        self.record(format!("describe_coverage {}", coverage));
        let state = self.state.read();
        if let Some((status, body)) = state.coverage_failures.get(coverage) {
            return Err(UpstreamError::status(Service::Wtss, *status, body.clone()));
        }
        state
            .coverages
            .get(coverage)
            .map(|attributes| CoverageDescription {
                name: Some(coverage.to_string()),
                attributes: attributes
                    .iter()
                    .map(|name| CoverageAttribute::Described { name: name.clone() })
                    .collect(),
            })
            .ok_or_else(|| {
                UpstreamError::status(
                    Service::Wtss,
                    404,
                    format!("coverage {} not found", coverage),
                )
            })
    }

    async fn geocode(&self, query: &str) -> UpstreamResult<Vec<GeocodePlace>> {
        self.record(format!("geocode {}", query));
        let state = self.state.read();
        if let Some((status, body)) = &state.geocode_failure {
            return Err(UpstreamError::status(Service::Geocoder, *status, body.clone()));
        }
        Ok(state
            .places
            .get(&normalize_query(query))
            .cloned()
            .unwrap_or_default())
    }
}

fn series_key(coverage: &str, attribute: &str) -> SeriesKey {
    (coverage.to_string(), attribute.to_ascii_uppercase())
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Build a minimal STAC item around Jacareí (SP).
pub fn sample_item(
    id: &str,
    collection: &str,
    datetime: &str,
    cloud_cover: Option<f64>,
) -> StacItem {
    StacItem {
        type_: "Feature".to_string(),
        id: id.to_string(),
        collection: Some(collection.to_string()),
        bbox: Some(vec![-46.5, -23.8, -45.5, -22.8]),
        geometry: None,
        properties: StacProperties {
            datetime: Some(datetime.to_string()),
            cloud_cover,
            extra: serde_json::Map::new(),
        },
        extra: serde_json::Map::new(),
    }
}
