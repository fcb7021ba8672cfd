//! Public API surface for the Rust backend.
//!
//! This file consolidates the domain types shared by the upstream clients,
//! the comparison pipeline and the HTTP layer. All types derive
//! Serialize/Deserialize for JSON serialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of an ISO `YYYY-MM-DD` date prefix.
pub const ISO_DATE_LEN: usize = 10;

/// A geographic point in decimal degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create a validated point.
    ///
    /// Latitude must lie in `[-90, 90]` and longitude in `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude must be between -90 and 90, got {}", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!(
                "longitude must be between -180 and 180, got {}",
                longitude
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a point from raw query-string values.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, String> {
        let lat: f64 = latitude
            .trim()
            .parse()
            .map_err(|_| format!("latitude is not a number: '{}'", latitude))?;
        let lon: f64 = longitude
            .trim()
            .parse()
            .map_err(|_| format!("longitude is not a number: '{}'", longitude))?;
        Self::new(lat, lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Inclusive date window used for time-series queries and scene filters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Parse an optional `(start, end)` pair of `YYYY-MM-DD` strings.
    ///
    /// Empty strings count as unset. A window whose start is after its end is rejected.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, String> {
        let start = parse_optional_date("start_date", start)?;
        let end = parse_optional_date("end_date", end)?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(format!("start_date {} is after end_date {}", s, e));
            }
        }
        Ok(Self { start, end })
    }

    /// Whether the date part of `datetime` (ISO 8601) falls inside the window.
    pub fn contains(&self, datetime: &str) -> bool {
        let day = iso_date_prefix(datetime);
        let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
            return false;
        };
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn start_param(&self) -> Option<String> {
        self.start.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn end_param(&self) -> Option<String> {
        self.end.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "full archive"),
            (Some(s), None) => write!(f, "from {}", s),
            (None, Some(e)) => write!(f, "until {}", e),
            (Some(s), Some(e)) => write!(f, "{} to {}", s, e),
        }
    }
}

fn parse_optional_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("{} must be formatted as YYYY-MM-DD, got '{}'", name, s)),
    }
}

/// The `YYYY-MM-DD` prefix of an ISO date or datetime string.
pub fn iso_date_prefix(value: &str) -> &str {
    value.get(..ISO_DATE_LEN).unwrap_or(value)
}

/// A satellite scene listed by the catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub collection: String,
    /// Acquisition timestamp as reported by the catalog.
    pub datetime: String,
    /// Date part of `datetime`.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
}

/// One `(collection, attribute)` time-series fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesTask {
    pub collection: String,
    pub attribute: String,
}

impl SeriesTask {
    pub fn new(collection: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for SeriesTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.attribute)
    }
}

/// One attribute of one collection over its own date axis.
///
/// `dates` and `values` always have the same length; `None` marks an absent observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSeries {
    pub collection: String,
    pub attribute: String,
    pub dates: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl AttributeSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Sorted, duplicate-free union of the dates of several series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterTimeline(Vec<String>);

impl MasterTimeline {
    /// Build from dates already sorted and de-duplicated.
    pub(crate) fn from_sorted(dates: Vec<String>) -> Self {
        MasterTimeline(dates)
    }

    pub fn dates(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A series re-expressed against a [`MasterTimeline`]; `values.len()` equals the timeline length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub collection: String,
    pub values: Vec<Option<f64>>,
}

/// A task that could not be completed, tagged with its `(collection, attribute)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub collection: String,
    pub attribute: String,
    pub message: String,
}

impl SeriesFailure {
    pub fn new(task: &SeriesTask, message: impl Into<String>) -> Self {
        Self {
            collection: task.collection.clone(),
            attribute: task.attribute.clone(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_parse() {
        let point = Coordinates::parse("-23.3054", " -45.9659").unwrap();
        assert_eq!(point.latitude, -23.3054);
        assert_eq!(point.longitude, -45.9659);
    }

    #[test]
    fn test_coordinates_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::parse("abc", "1").unwrap_err().contains("latitude"));
    }

    #[test]
    fn test_date_window_contains() {
        let window = DateWindow::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert!(window.contains("2024-01-01T13:30:00Z"));
        assert!(window.contains("2024-01-31"));
        assert!(!window.contains("2024-02-01T00:00:00Z"));
        assert!(!window.contains("not a date"));
        assert!(DateWindow::default().contains("1999-12-31"));
    }

    #[test]
    fn test_date_window_rejects_inverted_range() {
        let err = DateWindow::parse(Some("2024-02-01"), Some("2024-01-01")).unwrap_err();
        assert!(err.contains("after"));
    }

    #[test]
    fn test_date_window_empty_strings_are_unset() {
        let window = DateWindow::parse(Some(""), Some("  ")).unwrap();
        assert_eq!(window, DateWindow::default());
        assert_eq!(window.to_string(), "full archive");
    }

    #[test]
    fn test_date_window_rejects_bad_format() {
        let err = DateWindow::parse(Some("01/02/2024"), None).unwrap_err();
        assert!(err.contains("start_date"));
    }
}
