//! End-to-end tests of the REST API against the in-memory upstream.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use geoinsight::upstream::LocalDataCubeClient;
use support::{
    body_bytes, body_json, delete, get, post_json, post_raw, router_with_config, sample_router,
    unthrottled_config,
};

/// Query string of the Jacareí sample point.
const JACAREI: &str = "latitude=-23.3054&longitude=-45.9659";

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

/// Poll a comparison until it leaves the `running` state.
async fn wait_for_comparison(router: &Router, id: &str) -> Value {
    for _ in 0..500 {
        let body = body_json(send(router, get(&format!("/api/comparisons/{}", id))).await).await;
        if body["status"] != "running" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("comparison {} did not finish", id);
}

#[tokio::test]
async fn test_health() {
    let (router, _) = sample_router();
    let response = send(&router, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], true);
}

#[tokio::test]
async fn test_stac_search_requires_latitude() {
    let (router, client) = sample_router();
    let response = send(&router, get("/api/stac/search?longitude=-45.9659")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("latitude"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_stac_search_rejects_non_numeric_point() {
    let (router, _) = sample_router();
    let response = send(&router, get("/api/stac/search?latitude=abc&longitude=-45.9")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stac_search_merges_both_searches() {
    let (router, client) = sample_router();
    let response = send(&router, get(&format!("/api/stac/search?{}", JACAREI))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().unwrap().len(), 4);
    assert_eq!(body["context"]["limit"], 100);
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn test_stac_search_filters() {
    let (router, _) = sample_router();
    let response = send(
        &router,
        get(&format!(
            "/api/stac/search?{}&collection=S2-16D-2&start_date=2024-01-10",
            JACAREI
        )),
    )
    .await;
    let body = body_json(response).await;
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["id"], "S2-16D_V2_034018_20240117");
}

#[tokio::test]
async fn test_stac_search_relays_upstream_status() {
    let (router, client) = sample_router();
    client.fail_search(503, "Service Unavailable");
    let response = send(&router, get("/api/stac/search?latitude=-23.3&longitude=-45.9")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("BDC STAC"));
    assert!(body["detail"].as_str().unwrap().contains("Service Unavailable"));
}

#[tokio::test]
async fn test_scene_list_is_typed() {
    let (router, _) = sample_router();
    let response = send(&router, get(&format!("/api/stac/scenes?{}", JACAREI))).await;
    let body = body_json(response).await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["scenes"][0]["date"], "2024-01-17");
    assert_eq!(body["scenes"][0]["cloud_cover"], 10.1);
}

#[tokio::test]
async fn test_time_series_requires_all_params() {
    let (router, _) = sample_router();
    for (uri, missing) in [
        ("/api/wtss/time_series?longitude=1&coverage=S2-16D-2&attributes=NDVI", "latitude"),
        ("/api/wtss/time_series?latitude=1&longitude=1&attributes=NDVI", "coverage"),
        (
            "/api/wtss/time_series?latitude=1&longitude=1&coverage=S2-16D-2&attributes=",
            "attributes",
        ),
    ] {
        let response = send(&router, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains(missing), "{}", uri);
    }
}

#[tokio::test]
async fn test_time_series_forwards_window() {
    let (router, _) = sample_router();
    let response = send(
        &router,
        get(&format!(
            "/api/wtss/time_series?{}&coverage=S2-16D-2&attributes=NDVI,EVI&start_date=2024-01-10",
            JACAREI
        )),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["timeline"], json!(["2024-01-17", "2024-02-02"]));
    assert_eq!(body["result"]["attributes"][0]["values"], json!([7020.0, null]));
    assert_eq!(body["result"]["attributes"][1]["attribute"], "EVI");
}

#[tokio::test]
async fn test_time_series_relays_upstream_error() {
    let (router, client) = sample_router();
    client.fail_time_series("S2-16D-2", "NDVI", 429, "Too Many Requests");
    let response = send(
        &router,
        get(&format!(
            "/api/wtss/time_series?{}&coverage=S2-16D-2&attributes=NDVI",
            JACAREI
        )),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_attributes_fallback_on_upstream_404() {
    let (router, _) = sample_router();
    let response = send(&router, get("/api/wtss/attributes?coverage=S2-16D-2")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["coverages"][0]["source"], "fallback");
    let attributes = body["attributes"].as_array().unwrap();
    assert!(attributes.contains(&json!("NDVI")));
    assert!(attributes.contains(&json!("B8A")));
}

#[tokio::test]
async fn test_attributes_for_several_coverages() {
    let (router, _) = sample_router();
    let response = send(
        &router,
        get("/api/wtss/attributes?coverage=LANDSAT-16D-1,CB4-16D-2"),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["coverages"].as_array().unwrap().len(), 2);
    assert_eq!(body["coverages"][0]["source"], "upstream");
    assert_eq!(body["coverages"][1]["attributes"][0], "BAND13");
}

#[tokio::test]
async fn test_attributes_unknown_coverage_is_404() {
    let (router, _) = sample_router();
    let response = send(&router, get("/api/wtss/attributes?coverage=MOD13Q1-6.1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("MOD13Q1-6.1"));
}

#[tokio::test]
async fn test_geocode() {
    let (router, _) = sample_router();

    let response = send(&router, get("/api/geocode?query=Jacare%C3%AD%2C%20SP")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["lat"], -23.3054);
    assert_eq!(body["lon"], -45.9659);

    let response = send(&router, get("/api/geocode?query=Atlantis")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&router, get("/api/geocode")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comparison_with_partial_failure_and_export() {
    let (router, _) = sample_router();

    let response = send(
        &router,
        post_json(
            "/api/comparisons",
            json!({
                "latitude": -23.3054,
                "longitude": -45.9659,
                "collections": ["S2-16D-2", "LANDSAT-16D-1", "CB4-16D-2"]
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let created = body_json(response).await;
    assert_eq!(created["total_tasks"], 6);
    let id = created["comparison_id"].as_str().unwrap().to_string();

    let finished = wait_for_comparison(&router, &id).await;
    assert_eq!(finished["status"], "completed");
    assert_eq!(finished["progress"]["completed"], 6);
    assert_eq!(finished["request"]["attributes"], json!(["NDVI", "EVI"]));

    let result = &finished["result"];
    assert_eq!(result["exportable"], true);
    assert_eq!(result["failures"].as_array().unwrap().len(), 1);
    assert_eq!(result["failures"][0]["collection"], "CB4-16D-2");
    assert_eq!(result["failures"][0]["attribute"], "EVI");

    let ndvi = &result["charts"][0];
    assert_eq!(ndvi["attribute"], "NDVI");
    let labels = ndvi["labels"].as_array().unwrap();
    for dataset in ndvi["datasets"].as_array().unwrap() {
        assert_eq!(dataset["data"].as_array().unwrap().len(), labels.len());
    }

    let response = send(&router, get(&format!("/api/comparisons/{}/export", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("geoinsight_time_series_"));
    assert!(disposition.ends_with(".xlsx\""));
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");

    let response = send(&router, delete(&format!("/api/comparisons/{}", id))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&router, get(&format!("/api/comparisons/{}", id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comparison_events_end_with_complete() {
    let (router, _) = sample_router();
    let created = body_json(
        send(
            &router,
            post_json(
                "/api/comparisons",
                json!({
                    "latitude": -23.3054,
                    "longitude": -45.9659,
                    "collections": ["S2-16D-2"],
                    "attributes": ["NDVI"]
                }),
            ),
        )
        .await,
    )
    .await;
    let id = created["comparison_id"].as_str().unwrap().to_string();
    wait_for_comparison(&router, &id).await;

    let response = send(&router, get(&format!("/api/comparisons/{}/events", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("1 of 1 complete: S2-16D-2/NDVI"));
    assert!(text.contains("event: complete"));
}

#[tokio::test]
async fn test_comparison_with_no_data_cannot_export() {
    let (router, _) = sample_router();
    let created = body_json(
        send(
            &router,
            post_json(
                "/api/comparisons",
                json!({
                    "latitude": -23.3054,
                    "longitude": -45.9659,
                    "collections": ["S2-16D-2"],
                    "attributes": ["NDVI"],
                    "start_date": "2030-01-01"
                }),
            ),
        )
        .await,
    )
    .await;
    let id = created["comparison_id"].as_str().unwrap().to_string();

    let finished = wait_for_comparison(&router, &id).await;
    assert_eq!(finished["status"], "empty");
    assert_eq!(finished["result"]["exportable"], false);

    let response = send(&router, get(&format!("/api/comparisons/{}/export", id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NO_DATA");
}

#[tokio::test]
async fn test_comparison_all_failed() {
    let (router, client) = sample_router();
    client.fail_time_series("S2-16D-2", "NDVI", 500, "Internal Server Error");
    let created = body_json(
        send(
            &router,
            post_json(
                "/api/comparisons",
                json!({
                    "latitude": -23.3054,
                    "longitude": -45.9659,
                    "collections": ["S2-16D-2"],
                    "attributes": ["NDVI"]
                }),
            ),
        )
        .await,
    )
    .await;
    let id = created["comparison_id"].as_str().unwrap().to_string();
    let finished = wait_for_comparison(&router, &id).await;
    assert_eq!(finished["status"], "failed");
    assert!(finished["result"]["message"].as_str().unwrap().contains("All 1"));
}

#[tokio::test]
async fn test_comparison_validation() {
    let (router, _) = sample_router();
    let response = send(
        &router,
        post_json(
            "/api/comparisons",
            json!({"latitude": -23.3, "longitude": -45.9, "collections": []}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"]
        .as_str()
        .unwrap()
        .contains("collections"));
}

#[tokio::test]
async fn test_comparison_body_missing_latitude() {
    let (router, _) = sample_router();
    let response = send(
        &router,
        post_json(
            "/api/comparisons",
            json!({"longitude": -45.9, "collections": ["S2-16D-2"]}),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("latitude"));
}

#[tokio::test]
async fn test_comparison_body_malformed() {
    let (router, _) = sample_router();
    for raw in ["{not json", r#"{"latitude": "north", "longitude": 1, "collections": []}"#] {
        let response = send(&router, post_raw("/api/comparisons", raw)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", raw);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_export_while_running_is_conflict() {
    let mut config = unthrottled_config();
    config.wtss.throttle_interval_ms = 60_000;
    let router = router_with_config(Arc::new(LocalDataCubeClient::with_sample_data()), config);

    let created = body_json(
        send(
            &router,
            post_json(
                "/api/comparisons",
                json!({
                    "latitude": -23.3054,
                    "longitude": -45.9659,
                    "collections": ["S2-16D-2"],
                    "attributes": ["NDVI", "EVI"]
                }),
            ),
        )
        .await,
    )
    .await;
    let id = created["comparison_id"].as_str().unwrap().to_string();

    let status = body_json(send(&router, get(&format!("/api/comparisons/{}", id))).await).await;
    assert_eq!(status["status"], "running");

    let response = send(&router, get(&format!("/api/comparisons/{}/export", id))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("still running"));
}

#[tokio::test]
async fn test_finished_comparison_expires() {
    let mut config = unthrottled_config();
    config.wtss.session_retention_secs = 0;
    let router = router_with_config(Arc::new(LocalDataCubeClient::with_sample_data()), config);

    let created = body_json(
        send(
            &router,
            post_json(
                "/api/comparisons",
                json!({
                    "latitude": -23.3054,
                    "longitude": -45.9659,
                    "collections": ["S2-16D-2"],
                    "attributes": ["NDVI"]
                }),
            ),
        )
        .await,
    )
    .await;
    let id = created["comparison_id"].as_str().unwrap().to_string();

    let mut expired = false;
    for _ in 0..500 {
        let response = send(&router, get(&format!("/api/comparisons/{}", id))).await;
        if response.status() == StatusCode::NOT_FOUND {
            expired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(expired, "comparison {} never expired", id);

    for request in [
        get(&format!("/api/comparisons/{}/export", id)),
        get(&format!("/api/comparisons/{}/events", id)),
        delete(&format!("/api/comparisons/{}", id)),
    ] {
        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_unknown_comparison() {
    let (router, _) = sample_router();
    for request in [
        get("/api/comparisons/nope"),
        get("/api/comparisons/nope/export"),
        get("/api/comparisons/nope/events"),
        delete("/api/comparisons/nope"),
    ] {
        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
