//! Data Transfer Objects for the HTTP API.
//!
//! Query parameters arrive as optional strings so a missing parameter can be
//! reported by name with a 400 instead of a generic extractor rejection.

use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::api::{DateWindow, Scene, SeriesFailure};
use crate::services::attributes::CoverageAttributes;
use crate::services::chart::ChartData;
use crate::services::comparison::{ComparisonPlan, ComparisonResult};
use crate::services::comparison_tracker::{
    ComparisonSession, ComparisonStatus, LogEntry, Progress,
};

pub use crate::services::comparison::ComparisonRequest;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
}

/// Query for `/api/stac/search` and `/api/stac/scenes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacSearchQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    /// Keep only items of this collection
    pub collection: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Query for `/api/wtss/time_series`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeriesParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub coverage: Option<String>,
    /// Comma-separated attribute names
    pub attributes: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Query for `/api/wtss/attributes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributesQuery {
    /// One or more comma-separated coverages
    pub coverage: Option<String>,
}

/// Query for `/api/geocode`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeQuery {
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenesResponse {
    pub scenes: Vec<Scene>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributesResponse {
    pub coverages: Vec<CoverageAttributes>,
    /// Union of all attribute names, first-seen order
    pub attributes: Vec<String>,
}

/// Response for comparison creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComparisonResponse {
    pub comparison_id: String,
    pub total_tasks: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonStatusResponse {
    pub comparison_id: String,
    pub status: ComparisonStatus,
    pub progress: Progress,
    pub request: ComparisonPlan,
    pub logs: Vec<LogEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ComparisonResultDto>,
}

/// Chart-ready comparison result.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResultDto {
    pub charts: Vec<ChartData>,
    pub failures: Vec<SeriesFailure>,
    pub message: String,
    /// Whether `/export` will produce a workbook
    pub exportable: bool,
}

impl From<&ComparisonResult> for ComparisonResultDto {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            charts: result.charts(),
            failures: result.failures.clone(),
            message: result.summary(),
            exportable: !result.sheets.is_empty(),
        }
    }
}

impl From<ComparisonSession> for ComparisonStatusResponse {
    fn from(session: ComparisonSession) -> Self {
        Self {
            result: session.result.as_ref().map(ComparisonResultDto::from),
            comparison_id: session.comparison_id,
            status: session.status,
            progress: session.progress,
            request: session.plan,
            logs: session.logs,
            created_at: session.created_at,
            completed_at: session.completed_at,
        }
    }
}

/// The trimmed value of a required parameter, or a 400 naming it.
pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing_param(name))
}

/// Parse the optional `start_date`/`end_date` pair.
pub fn date_window(start: &Option<String>, end: &Option<String>) -> Result<DateWindow, AppError> {
    DateWindow::parse(start.as_deref(), end.as_deref()).map_err(AppError::BadRequest)
}
