//! Application configuration.
//!
//! Settings are read from a TOML file (see `geoinsight.toml` at the repository
//! root) and then overridden by environment variables. Every field has a
//! default, so running without a file talks to the public Brazil Data Cube
//! endpoints on port 3000.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "GEOINSIGHT_CONFIG";

/// Largest STAC page size accepted per search.
pub const MAX_SEARCH_LIMIT: u32 = 10_000;

/// Longest spacing between time-series requests (ten minutes).
pub const MAX_THROTTLE_MS: u64 = 600_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var} has an invalid value '{value}'")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub stac: StacSettings,
    #[serde(default)]
    pub wtss: WtssSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub scaling: ScalingSettings,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `http` (real upstreams) or `local` (in-memory fixtures).
    #[serde(default = "default_upstream_mode")]
    pub upstream_mode: String,
}

/// STAC catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacSettings {
    #[serde(default = "default_stac_url")]
    pub base_url: String,
    /// Collections that also offer WTSS time series; always searched explicitly.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Half-width in degrees of the box built around a queried point.
    #[serde(default = "default_bbox_epsilon")]
    pub bbox_epsilon: f64,
    #[serde(default = "default_data_timeout")]
    pub timeout_secs: u64,
}

/// WTSS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WtssSettings {
    #[serde(default = "default_wtss_url")]
    pub base_url: String,
    #[serde(default = "default_data_timeout")]
    pub timeout_secs: u64,
    /// Minimum spacing between consecutive time-series requests of one comparison.
    #[serde(default = "default_throttle_ms")]
    pub throttle_interval_ms: u64,
    /// Attributes compared when a request does not name any.
    #[serde(default = "default_attributes")]
    pub default_attributes: Vec<String>,
    /// Attribute lists served when the coverage description answers 404.
    #[serde(default = "default_attribute_fallbacks")]
    pub attribute_fallbacks: BTreeMap<String, Vec<String>>,
    /// How long a finished comparison stays available before it is discarded.
    #[serde(default = "default_session_retention")]
    pub session_retention_secs: u64,
}

/// Geocoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    /// Nominatim refuses anonymous clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
}

/// Per-attribute multiplicative scale factors for integer-encoded values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingSettings {
    #[serde(default = "default_scale_factors")]
    pub factors: BTreeMap<String, f64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_mode() -> String {
    "http".to_string()
}

fn default_stac_url() -> String {
    "https://data.inpe.br/bdc/stac/v1".to_string()
}

fn default_wtss_url() -> String {
    "https://data.inpe.br/bdc/wtss/v4".to_string()
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_user_agent() -> String {
    "GeoInsight/1.0 (contato@octacode.example)".to_string()
}

fn default_collections() -> Vec<String> {
    vec![
        "S2-16D-2".to_string(),
        "LANDSAT-16D-1".to_string(),
        "CB4-16D-2".to_string(),
    ]
}

fn default_search_limit() -> u32 {
    50
}

fn default_bbox_epsilon() -> f64 {
    0.0001
}

fn default_data_timeout() -> u64 {
    30
}

fn default_geocoder_timeout() -> u64 {
    10
}

fn default_throttle_ms() -> u64 {
    2000
}

fn default_session_retention() -> u64 {
    3600
}

fn default_attributes() -> Vec<String> {
    vec!["NDVI".to_string(), "EVI".to_string()]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_attribute_fallbacks() -> BTreeMap<String, Vec<String>> {
    let mut table = BTreeMap::new();
    table.insert(
        "S2-16D-2".to_string(),
        strings(&[
            "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B09", "B11", "B12",
            "EVI", "NDVI", "NBR", "SCL", "CLEAROB", "TOTALOB", "PROVENANCE",
        ]),
    );
    table.insert(
        "LANDSAT-16D-1".to_string(),
        strings(&[
            "coastal", "blue", "green", "red", "nir08", "swir16", "swir22", "EVI", "NDVI",
            "qa_pixel", "CLEAROB", "TOTALOB", "PROVENANCE",
        ]),
    );
    table.insert(
        "CB4-16D-2".to_string(),
        strings(&[
            "BAND13", "BAND14", "BAND15", "BAND16", "EVI", "NDVI", "CMASK", "CLEAROB", "TOTALOB",
            "PROVENANCE",
        ]),
    );
    table
}

fn default_scale_factors() -> BTreeMap<String, f64> {
    let mut factors = BTreeMap::new();
    factors.insert("NDVI".to_string(), 0.0001);
    factors.insert("EVI".to_string(), 0.0001);
    factors
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_mode: default_upstream_mode(),
        }
    }
}

impl Default for StacSettings {
    fn default() -> Self {
        Self {
            base_url: default_stac_url(),
            collections: default_collections(),
            search_limit: default_search_limit(),
            bbox_epsilon: default_bbox_epsilon(),
            timeout_secs: default_data_timeout(),
        }
    }
}

impl Default for WtssSettings {
    fn default() -> Self {
        Self {
            base_url: default_wtss_url(),
            timeout_secs: default_data_timeout(),
            throttle_interval_ms: default_throttle_ms(),
            default_attributes: default_attributes(),
            attribute_fallbacks: default_attribute_fallbacks(),
            session_retention_secs: default_session_retention(),
        }
    }
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoder_timeout(),
        }
    }
}

impl Default for ScalingSettings {
    fn default() -> Self {
        Self {
            factors: default_scale_factors(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the first `geoinsight.toml` found in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when no file exists.
    pub fn from_default_location() -> Result<Option<Self>, ConfigError> {
        let search_paths = [
            PathBuf::from("geoinsight.toml"),
            PathBuf::from("backend/geoinsight.toml"),
            PathBuf::from("../geoinsight.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Resolve the full configuration: file (explicit or default location),
    /// then environment overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::from_default_location()?.unwrap_or_default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// # Environment Variables
    /// - `HOST`, `PORT`: listener address (default `0.0.0.0:3000`)
    /// - `BDC_STAC_URL`, `BDC_WTSS_URL`, `GEOCODER_URL`: upstream base URLs
    /// - `GEOCODER_USER_AGENT`: identifying header sent to the geocoder
    /// - `WTSS_THROTTLE_MS`: spacing between sequential time-series requests
    /// - `UPSTREAM_TIMEOUT_SECS`: timeout for STAC and WTSS requests
    /// - `UPSTREAM_MODE`: `http` or `local`
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_string("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("PORT")? {
            self.server.port = port;
        }
        if let Some(mode) = env_string("UPSTREAM_MODE") {
            self.server.upstream_mode = mode;
        }
        if let Some(url) = env_string("BDC_STAC_URL") {
            self.stac.base_url = url;
        }
        if let Some(url) = env_string("BDC_WTSS_URL") {
            self.wtss.base_url = url;
        }
        if let Some(url) = env_string("GEOCODER_URL") {
            self.geocoder.base_url = url;
        }
        if let Some(agent) = env_string("GEOCODER_USER_AGENT") {
            self.geocoder.user_agent = agent;
        }
        if let Some(ms) = env_parse::<u64>("WTSS_THROTTLE_MS")? {
            self.wtss.throttle_interval_ms = ms;
        }
        if let Some(secs) = env_parse::<u64>("UPSTREAM_TIMEOUT_SECS")? {
            self.stac.timeout_secs = secs;
            self.wtss.timeout_secs = secs;
        }
        Ok(())
    }

    /// Reject settings that would make the proxy misbehave at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }
        if !(self.stac.bbox_epsilon.is_finite() && self.stac.bbox_epsilon > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stac.bbox_epsilon must be a positive number, got {}",
                self.stac.bbox_epsilon
            )));
        }
        for (name, url) in [
            ("stac.base_url", &self.stac.base_url),
            ("wtss.base_url", &self.wtss.base_url),
            ("geocoder.base_url", &self.geocoder.base_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
            }
        }
        if self.stac.search_limit == 0 || self.stac.search_limit > MAX_SEARCH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "stac.search_limit must be between 1 and {}, got {}",
                MAX_SEARCH_LIMIT, self.stac.search_limit
            )));
        }
        if self.wtss.throttle_interval_ms > MAX_THROTTLE_MS {
            return Err(ConfigError::Invalid(format!(
                "wtss.throttle_interval_ms must be at most {}, got {}",
                MAX_THROTTLE_MS, self.wtss.throttle_interval_ms
            )));
        }
        if self.geocoder.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "geocoder.user_agent must identify the application".into(),
            ));
        }
        if let Some((attribute, factor)) = self
            .scaling
            .factors
            .iter()
            .find(|(_, factor)| !factor.is_finite())
        {
            return Err(ConfigError::Invalid(format!(
                "scaling factor for {} is not finite: {}",
                attribute, factor
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.wtss.throttle_interval_ms)
    }

    pub fn session_retention(&self) -> Duration {
        Duration::from_secs(self.wtss.session_retention_secs)
    }
}

fn env_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}
