//! Typed request and response schemas for the upstream services.
//!
//! Responses are validated once at the client boundary; the rest of the crate
//! consumes these shapes instead of probing raw JSON. Fields the proxy does
//! not interpret are kept in `extra` maps so relayed payloads stay intact.

use serde::{Deserialize, Serialize};

use crate::api::{Coordinates, DateWindow};
use crate::services::bbox::BoundingBox;

// =========================================================
// STAC search
// =========================================================

/// Query for `GET {stac}/search`.
#[derive(Debug, Clone, PartialEq)]
pub struct StacSearchParams {
    pub bbox: BoundingBox,
    pub limit: u32,
    /// Collection filter; `None` searches every collection.
    pub collections: Option<Vec<String>>,
}

impl StacSearchParams {
    pub fn new(bbox: BoundingBox, limit: u32) -> Self {
        Self {
            bbox,
            limit,
            collections: None,
        }
    }

    pub fn collections(mut self, collections: &[String]) -> Self {
        self.collections = Some(collections.to_vec());
        self
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("bbox", self.bbox.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(collections) = &self.collections {
            query.push(("collections", collections.join(",")));
        }
        query
    }
}

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub type_: String,

    #[serde(default)]
    pub features: Vec<StacItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

impl StacItemCollection {
    pub fn empty() -> Self {
        Self {
            type_: feature_collection_type(),
            features: Vec::new(),
            links: Vec::new(),
            context: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type", default = "feature_type")]
    pub type_: String,

    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,

    #[serde(default)]
    pub properties: StacProperties,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// The item properties the proxy reads; everything else is carried along.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StacProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(
        rename = "eo:cloud_cover",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cloud_cover: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StacItem {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bbox.as_deref().and_then(BoundingBox::from_stac)
    }
}

// =========================================================
// WTSS
// =========================================================

/// Query for `GET {wtss}/time_series`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesQuery {
    pub point: Coordinates,
    pub coverage: String,
    pub attributes: Vec<String>,
    pub window: DateWindow,
}

impl TimeSeriesQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("latitude", self.point.latitude.to_string()),
            ("longitude", self.point.longitude.to_string()),
            ("coverage", self.coverage.clone()),
            ("attributes", self.attributes.join(",")),
        ];
        if let Some(start) = self.window.start_param() {
            query.push(("start_date", start));
        }
        if let Some(end) = self.window.end_param() {
            query.push(("end_date", end));
        }
        query
    }
}

/// Response of the WTSS `time_series` operation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesResponse {
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub query: serde_json::Value,
    pub result: TimeSeriesResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesResult {
    pub attributes: Vec<TimeSeriesAttribute>,
    pub timeline: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub coordinates: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesAttribute {
    pub attribute: String,
    pub values: Vec<Option<f64>>,
}

impl TimeSeriesResponse {
    pub fn attribute(&self, name: &str) -> Option<&TimeSeriesAttribute> {
        self.result
            .attributes
            .iter()
            .find(|a| a.attribute.eq_ignore_ascii_case(name))
    }
}

/// Response of the WTSS coverage description (`GET {wtss}/{coverage}`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CoverageDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<CoverageAttribute>,
}

/// Attribute entry; WTSS versions disagree on whether this is a bare name or an object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CoverageAttribute {
    Name(String),
    Described { name: String },
}

impl CoverageAttribute {
    pub fn name(&self) -> &str {
        match self {
            CoverageAttribute::Name(name) => name,
            CoverageAttribute::Described { name } => name,
        }
    }
}

impl CoverageDescription {
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name().to_string()).collect()
    }
}

// =========================================================
// Geocoder
// =========================================================

/// A Nominatim search hit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeocodePlace {
    pub lat: NumberOrText,
    pub lon: NumberOrText,
    #[serde(default)]
    pub display_name: String,
}

/// Nominatim encodes coordinates as strings; other geocoders use numbers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
        .filter(|v: &f64| v.is_finite())
    }
}
