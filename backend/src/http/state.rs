//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::comparison_tracker::ComparisonTracker;
use crate::services::scaling::ScalePolicy;
use crate::upstream::DataCubeClient;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upstream client (live HTTP or in-memory)
    pub client: Arc<dyn DataCubeClient>,
    pub config: Arc<AppConfig>,
    /// Comparison sessions run in the background
    pub comparisons: ComparisonTracker,
}

impl AppState {
    pub fn new(client: Arc<dyn DataCubeClient>, config: AppConfig) -> Self {
        let comparisons = ComparisonTracker::with_retention(config.session_retention());
        Self {
            client,
            config: Arc::new(config),
            comparisons,
        }
    }

    pub fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy::from_settings(&self.config.scaling)
    }
}
