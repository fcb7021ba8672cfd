//! Point-to-bounding-box conversion for catalog searches.
//!
//! The STAC search endpoint rejects degenerate boxes, so a point query is sent
//! as a small square centred on the point. The half-width comes from
//! `stac.bbox_epsilon` in the configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::Coordinates;

/// Axis-aligned box in `[west, south, east, north]` order.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Square of half-width `epsilon` degrees centred on `point`.
    pub fn around(point: Coordinates, epsilon: f64) -> Self {
        Self {
            min_lon: point.longitude - epsilon,
            min_lat: point.latitude - epsilon,
            max_lon: point.longitude + epsilon,
            max_lat: point.latitude + epsilon,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_lon >= self.max_lon || self.min_lat >= self.max_lat
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Build from a STAC `bbox` array (2D or 3D form).
    pub fn from_stac(values: &[f64]) -> Option<Self> {
        match values {
            &[w, s, e, n] | &[w, s, _, e, n, _] => Some(Self {
                min_lon: w,
                min_lat: s,
                max_lon: e,
                max_lat: n,
            }),
            _ => None,
        }
    }
}

/// Renders the `bbox` query parameter: `west,south,east,north`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
