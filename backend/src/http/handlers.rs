//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    date_window, require, AttributesQuery, AttributesResponse, ComparisonRequest,
    ComparisonStatusResponse, CreateComparisonResponse, GeocodeQuery, HealthResponse,
    ScenesResponse, StacSearchQuery, TimeSeriesParams,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::Coordinates;
use crate::services::attributes::{discover_attributes, parse_name_list, union_attributes};
use crate::services::comparison_processor::spawn_comparison;
use crate::services::export::{export_file_name, write_workbook, ExportError, XLSX_CONTENT_TYPE};
use crate::services::geocode::{geocode as geocode_place, GeocodeMatch};
use crate::services::scenes::{scenes_of, search_scenes, SceneFilter};
use crate::upstream::{StacItemCollection, TimeSeriesQuery, TimeSeriesResponse};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Catalog (STAC)
// =============================================================================

fn scene_request(query: &StacSearchQuery) -> Result<(Coordinates, SceneFilter), AppError> {
    let latitude = require(&query.latitude, "latitude")?;
    let longitude = require(&query.longitude, "longitude")?;
    let point = Coordinates::parse(latitude, longitude).map_err(AppError::BadRequest)?;
    let filter = SceneFilter {
        collection: query
            .collection
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        window: date_window(&query.start_date, &query.end_date)?,
    };
    Ok((point, filter))
}

/// GET /api/stac/search
///
/// Items around a point from the compatible cubes plus an open search.
pub async fn search_stac(
    State(state): State<AppState>,
    Query(query): Query<StacSearchQuery>,
) -> HandlerResult<StacItemCollection> {
    let (point, filter) = scene_request(&query)?;
    let items = search_scenes(state.client.as_ref(), &state.config.stac, point, &filter)
        .await
        .inspect_err(|e| tracing::warn!(%point, error = %e, "STAC search failed"))?;
    Ok(Json(items))
}

/// GET /api/stac/scenes
///
/// Same search as `/api/stac/search`, flattened to typed scenes, newest first.
pub async fn list_scenes(
    State(state): State<AppState>,
    Query(query): Query<StacSearchQuery>,
) -> HandlerResult<ScenesResponse> {
    let (point, filter) = scene_request(&query)?;
    let items = search_scenes(state.client.as_ref(), &state.config.stac, point, &filter)
        .await
        .inspect_err(|e| tracing::warn!(%point, error = %e, "STAC search failed"))?;
    let scenes = scenes_of(&items);
    Ok(Json(ScenesResponse {
        total: scenes.len(),
        scenes,
    }))
}

// =============================================================================
// Time series (WTSS)
// =============================================================================

/// GET /api/wtss/time_series
pub async fn time_series(
    State(state): State<AppState>,
    Query(params): Query<TimeSeriesParams>,
) -> HandlerResult<TimeSeriesResponse> {
    let latitude = require(&params.latitude, "latitude")?;
    let longitude = require(&params.longitude, "longitude")?;
    let coverage = require(&params.coverage, "coverage")?;
    let attributes = parse_name_list(require(&params.attributes, "attributes")?);
    if attributes.is_empty() {
        return Err(AppError::missing_param("attributes"));
    }

    let query = TimeSeriesQuery {
        point: Coordinates::parse(latitude, longitude).map_err(AppError::BadRequest)?,
        coverage: coverage.to_string(),
        attributes,
        window: date_window(&params.start_date, &params.end_date)?,
    };

    let response = state.client.time_series(&query).await.inspect_err(|e| {
        tracing::warn!(
            coverage = %query.coverage,
            attributes = %query.attributes.join(","),
            point = %query.point,
            status = ?e.status_code(),
            error = %e,
            "WTSS time series request failed"
        )
    })?;
    Ok(Json(response))
}

/// GET /api/wtss/attributes
///
/// Attribute names for one or more comma-separated coverages.
pub async fn coverage_attributes(
    State(state): State<AppState>,
    Query(query): Query<AttributesQuery>,
) -> HandlerResult<AttributesResponse> {
    let coverages = parse_name_list(require(&query.coverage, "coverage")?);
    if coverages.is_empty() {
        return Err(AppError::missing_param("coverage"));
    }

    let described = discover_attributes(
        state.client.as_ref(),
        &coverages,
        &state.config.wtss.attribute_fallbacks,
    )
    .await
    .inspect_err(|e| {
        tracing::warn!(
            coverages = %coverages.join(","),
            status = ?e.status_code(),
            error = %e,
            "Coverage description failed"
        )
    })?;

    Ok(Json(AttributesResponse {
        attributes: union_attributes(&described),
        coverages: described,
    }))
}

// =============================================================================
// Geocoding
// =============================================================================

/// GET /api/geocode
pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> HandlerResult<GeocodeMatch> {
    let text = require(&query.query, "query")?;
    let found = geocode_place(state.client.as_ref(), text)
        .await
        .inspect_err(|e| tracing::warn!(query = text, error = %e, "Geocoding failed"))?;
    found
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No location found for '{}'", text)))
}

// =============================================================================
// Comparisons
// =============================================================================

/// POST /api/comparisons
///
/// Start a comparison in the background. Returns its id for tracking progress.
pub async fn create_comparison(
    State(state): State<AppState>,
    payload: Result<Json<ComparisonRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateComparisonResponse>), AppError> {
    let Json(request) = payload?;
    let plan = request
        .plan(&state.config.wtss.default_attributes)
        .map_err(AppError::BadRequest)?;
    let total_tasks = plan.tasks.len();

    let comparison_id = state.comparisons.create(plan.clone());
    tracing::info!(%comparison_id, total_tasks, point = %plan.point, "Comparison started");

    spawn_comparison(
        comparison_id.clone(),
        state.comparisons.clone(),
        state.client.clone(),
        state.scale_policy(),
        state.config.throttle_interval(),
        plan,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateComparisonResponse {
            message: format!(
                "Comparison started. Track progress at /api/comparisons/{}/events",
                comparison_id
            ),
            comparison_id,
            total_tasks,
        }),
    ))
}

/// GET /api/comparisons/{comparison_id}
pub async fn get_comparison(
    State(state): State<AppState>,
    Path(comparison_id): Path<String>,
) -> HandlerResult<ComparisonStatusResponse> {
    let session = state
        .comparisons
        .get(&comparison_id)
        .ok_or_else(|| comparison_not_found(&comparison_id))?;
    Ok(Json(session.into()))
}

/// GET /api/comparisons/{comparison_id}/events
///
/// Stream comparison logs via Server-Sent Events (SSE).
pub async fn stream_comparison_events(
    State(state): State<AppState>,
    Path(comparison_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.comparisons.status(&comparison_id).is_none() {
        return Err(comparison_not_found(&comparison_id));
    }

    let tracker = state.comparisons.clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let logs = tracker.get_logs(&comparison_id);
            for entry in logs.iter().skip(sent) {
                let data = serde_json::to_string(entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }
            sent = logs.len();

            match tracker.get(&comparison_id) {
                Some(session) if session.status.is_finished() => {
                    let final_event = serde_json::json!({
                        "status": session.status,
                        "progress": session.progress,
                        "message": session.result.as_ref().map(|r| r.summary()),
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
                Some(_) => {}
                None => break,
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}

/// GET /api/comparisons/{comparison_id}/export
///
/// Download the finished comparison as an xlsx workbook, one tab per attribute.
pub async fn export_comparison(
    State(state): State<AppState>,
    Path(comparison_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .comparisons
        .get(&comparison_id)
        .ok_or_else(|| comparison_not_found(&comparison_id))?;
    let result = match session.result {
        Some(result) => result,
        None if session.status.is_finished() => return Err(ExportError::NoData.into()),
        None => {
            return Err(AppError::Conflict(format!(
                "Comparison {} is still running",
                comparison_id
            )))
        }
    };

    let bytes = tokio::task::spawn_blocking(move || write_workbook(&result.sheets))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let file_name = export_file_name(chrono::Utc::now().date_naive());
    tracing::info!(%comparison_id, %file_name, size = bytes.len(), "Exported comparison");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

/// DELETE /api/comparisons/{comparison_id}
pub async fn delete_comparison(
    State(state): State<AppState>,
    Path(comparison_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.comparisons.remove(&comparison_id) {
        tracing::info!(%comparison_id, "Comparison discarded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(comparison_not_found(&comparison_id))
    }
}

fn comparison_not_found(comparison_id: &str) -> AppError {
    AppError::NotFound(format!("Comparison {} not found", comparison_id))
}
