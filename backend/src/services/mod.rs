//! Service layer for business logic and orchestration.
//!
//! This module sits between the HTTP handlers and the upstream clients.
//! Proxy operations (scene search, attribute discovery, geocoding) live next
//! to the comparison pipeline: the throttled fetcher, scale policy, timeline
//! merger, export builder and the session tracker that runs it in the
//! background.

pub mod attributes;
pub mod bbox;
pub mod chart;
pub mod comparison;
pub mod comparison_processor;
pub mod comparison_tracker;
pub mod export;
pub mod fetcher;
pub mod geocode;
pub mod scaling;
pub mod scenes;
pub mod throttle;
pub mod timeline;

pub use attributes::{discover_attributes, AttributeSource, CoverageAttributes};
pub use bbox::BoundingBox;
pub use chart::{ChartData, ChartDataset};
pub use comparison::{ComparisonOutcome, ComparisonPlan, ComparisonRequest, ComparisonResult};
pub use comparison_tracker::{ComparisonStatus, ComparisonTracker, LogEntry, LogLevel};
pub use export::{write_workbook, ExportError, ExportSheet};
pub use fetcher::{BatchOutcome, BatchProgress, SequentialFetcher};
pub use scaling::ScalePolicy;
pub use throttle::Throttle;
pub use timeline::merge_timelines;
