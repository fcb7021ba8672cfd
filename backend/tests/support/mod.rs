#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;

use geoinsight::config::AppConfig;
use geoinsight::http::{create_router, AppState};
use geoinsight::upstream::LocalDataCubeClient;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to process-global
/// env vars, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

/// Every variable `AppConfig::apply_env` reads, cleared.
pub const CLEAR_CONFIG_ENV: &[(&str, Option<&str>)] = &[
    ("GEOINSIGHT_CONFIG", None),
    ("HOST", None),
    ("PORT", None),
    ("UPSTREAM_MODE", None),
    ("BDC_STAC_URL", None),
    ("BDC_WTSS_URL", None),
    ("GEOCODER_URL", None),
    ("GEOCODER_USER_AGENT", None),
    ("WTSS_THROTTLE_MS", None),
    ("UPSTREAM_TIMEOUT_SECS", None),
];

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Default configuration without request spacing, so comparisons finish quickly.
pub fn unthrottled_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.wtss.throttle_interval_ms = 0;
    config
}

/// Router over the given in-memory client.
pub fn router_with(client: Arc<LocalDataCubeClient>) -> Router {
    router_with_config(client, unthrottled_config())
}

/// Router over the given in-memory client and configuration.
pub fn router_with_config(client: Arc<LocalDataCubeClient>, config: AppConfig) -> Router {
    create_router(AppState::new(client, config))
}

/// Router over the Jacareí sample data.
pub fn sample_router() -> (Router, Arc<LocalDataCubeClient>) {
    let client = Arc::new(LocalDataCubeClient::with_sample_data());
    (router_with(client.clone()), client)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
