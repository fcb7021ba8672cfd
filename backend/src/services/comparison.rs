//! The comparison pipeline.
//!
//! ```text
//! ComparisonRequest ──plan──► tasks (collection x attribute)
//!        │
//!        ▼
//! SequentialFetcher (throttled, one at a time, scaled)
//!        │  AttributeSeries + SeriesFailure
//!        ▼
//! group by attribute ──► merge_timelines ──► ExportSheet per attribute
//!        │
//!        ▼
//! ComparisonResult ──► charts / workbook
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::api::{AttributeSeries, Coordinates, DateWindow, SeriesFailure, SeriesTask};
use crate::services::chart::ChartData;
use crate::services::export::ExportSheet;
use crate::services::fetcher::{BatchOutcome, BatchProgress, SequentialFetcher};
use crate::services::scaling::ScalePolicy;

/// Body of `POST /api/comparisons`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub collections: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// A validated request with its ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPlan {
    pub point: Coordinates,
    pub window: DateWindow,
    pub collections: Vec<String>,
    pub attributes: Vec<String>,
    pub tasks: Vec<SeriesTask>,
}

impl ComparisonRequest {
    /// Validate the request; `default_attributes` apply when none are given.
    pub fn plan(&self, default_attributes: &[String]) -> Result<ComparisonPlan, String> {
        let point = Coordinates::new(self.latitude, self.longitude)?;
        let window = DateWindow::parse(self.start_date.as_deref(), self.end_date.as_deref())?;

        let collections = clean_list(&self.collections);
        if collections.is_empty() {
            return Err("collections must name at least one collection".to_string());
        }
        let mut attributes = clean_list(&self.attributes);
        if attributes.is_empty() {
            attributes = clean_list(default_attributes);
        }
        if attributes.is_empty() {
            return Err("attributes must name at least one attribute".to_string());
        }

        let tasks = plan_tasks(&collections, &attributes);
        Ok(ComparisonPlan {
            point,
            window,
            collections,
            attributes,
            tasks,
        })
    }
}

/// Every collection paired with every attribute, collection-major.
pub fn plan_tasks(collections: &[String], attributes: &[String]) -> Vec<SeriesTask> {
    collections
        .iter()
        .flat_map(|c| attributes.iter().map(move |a| SeriesTask::new(c.as_str(), a.as_str())))
        .collect()
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

/// Terminal state of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOutcome {
    /// At least one attribute has data
    Completed,
    /// Requests succeeded but returned no dates
    Empty,
    /// Every request failed
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub sheets: Vec<ExportSheet>,
    pub failures: Vec<SeriesFailure>,
    pub total_tasks: usize,
}

impl ComparisonResult {
    pub fn outcome(&self) -> ComparisonOutcome {
        if !self.sheets.is_empty() {
            ComparisonOutcome::Completed
        } else if self.total_tasks > 0 && self.failures.len() == self.total_tasks {
            ComparisonOutcome::Failed
        } else {
            ComparisonOutcome::Empty
        }
    }

    pub fn charts(&self) -> Vec<ChartData> {
        self.sheets.iter().map(ChartData::from).collect()
    }

    pub fn summary(&self) -> String {
        match self.outcome() {
            ComparisonOutcome::Completed if self.failures.is_empty() => {
                format!("{} chart(s) ready", self.sheets.len())
            }
            ComparisonOutcome::Completed => format!(
                "{} chart(s) ready; {} of {} series failed",
                self.sheets.len(),
                self.failures.len(),
                self.total_tasks
            ),
            ComparisonOutcome::Empty => {
                "No data found for the selected point and period".to_string()
            }
            ComparisonOutcome::Failed => {
                format!("All {} time-series requests failed", self.total_tasks)
            }
        }
    }
}

/// Group a batch by attribute (first-seen order) and build one sheet per attribute.
///
/// Attributes whose merged timeline is empty produce no sheet.
pub fn assemble(
    plan: &ComparisonPlan,
    outcome: BatchOutcome,
    policy: &ScalePolicy,
) -> ComparisonResult {
    let mut groups: Vec<(String, Vec<AttributeSeries>)> = Vec::new();
    for series in outcome.series {
        match groups.iter().position(|(attr, _)| *attr == series.attribute) {
            Some(idx) => groups[idx].1.push(series),
            None => groups.push((series.attribute.clone(), vec![series])),
        }
    }

    let sheets = groups
        .into_iter()
        .map(|(attribute, members)| {
            let factor = policy.factor_for(&attribute);
            ExportSheet::build(attribute, &members, plan.point, plan.window, factor)
        })
        .filter(|sheet| !sheet.is_empty())
        .collect();

    ComparisonResult {
        sheets,
        failures: outcome.failures,
        total_tasks: plan.tasks.len(),
    }
}

/// Fetch every task of `plan` and assemble the result.
pub async fn run_comparison<F>(
    fetcher: &mut SequentialFetcher,
    plan: &ComparisonPlan,
    on_progress: F,
) -> ComparisonResult
where
    F: FnMut(&BatchProgress),
{
    let outcome = fetcher
        .fetch_all(plan.point, plan.window, &plan.tasks, on_progress)
        .await;
    assemble(plan, outcome, fetcher.policy())
}
