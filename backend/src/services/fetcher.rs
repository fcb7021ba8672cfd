//! Sequential, throttled time-series fetching.
//!
//! The WTSS service rate-limits aggressively, so a batch of `(collection,
//! attribute)` tasks is fetched strictly one at a time with a minimum interval
//! between request starts. One failing task never aborts the batch.

use serde::Serialize;
use std::sync::Arc;

use crate::api::{
    iso_date_prefix, AttributeSeries, Coordinates, DateWindow, SeriesFailure, SeriesTask,
};
use crate::services::scaling::ScalePolicy;
use crate::services::throttle::Throttle;
use crate::upstream::{DataCubeClient, TimeSeriesQuery, TimeSeriesResponse};

/// Progress after one task finished, successfully or not.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub task: SeriesTask,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a batch produced, in task order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub series: Vec<AttributeSeries>,
    pub failures: Vec<SeriesFailure>,
}

impl BatchOutcome {
    pub fn attempted(&self) -> usize {
        self.series.len() + self.failures.len()
    }
}

pub struct SequentialFetcher {
    client: Arc<dyn DataCubeClient>,
    policy: ScalePolicy,
    throttle: Throttle,
}

impl SequentialFetcher {
    pub fn new(client: Arc<dyn DataCubeClient>, policy: ScalePolicy, throttle: Throttle) -> Self {
        Self {
            client,
            policy,
            throttle,
        }
    }

    pub fn policy(&self) -> &ScalePolicy {
        &self.policy
    }

    /// Fetch every task in order, reporting progress after each one.
    ///
    /// At most one request is in flight at any time.
    pub async fn fetch_all<F>(
        &mut self,
        point: Coordinates,
        window: DateWindow,
        tasks: &[SeriesTask],
        mut on_progress: F,
    ) -> BatchOutcome
    where
        F: FnMut(&BatchProgress),
    {
        let mut outcome = BatchOutcome::default();

        for (idx, task) in tasks.iter().enumerate() {
            let waited = self.throttle.ready().await;
            if !waited.is_zero() {
                log::debug!("Throttled {} by {:?}", task, waited);
            }

            let error = match self.fetch_one(point, window, task).await {
                Ok(series) => {
                    outcome.series.push(series);
                    None
                }
                Err(message) => {
                    log::warn!("Time series {} failed: {}", task, message);
                    outcome.failures.push(SeriesFailure::new(task, message.clone()));
                    Some(message)
                }
            };

            on_progress(&BatchProgress {
                completed: idx + 1,
                total: tasks.len(),
                task: task.clone(),
                error,
            });
        }

        outcome
    }

    async fn fetch_one(
        &self,
        point: Coordinates,
        window: DateWindow,
        task: &SeriesTask,
    ) -> Result<AttributeSeries, String> {
        let query = TimeSeriesQuery {
            point,
            coverage: task.collection.clone(),
            attributes: vec![task.attribute.clone()],
            window,
        };
        let response = self
            .client
            .time_series(&query)
            .await
            .map_err(|e| e.to_string())?;
        let mut series = extract_series(task, &response)?;
        series.values = self.policy.apply(&series.attribute, &series.values);
        Ok(series)
    }
}

/// Pull the task's attribute out of a WTSS response.
///
/// Timeline entries are cut to their `YYYY-MM-DD` prefix. A response without
/// the attribute, or whose values do not line up with its timeline, is an error.
pub fn extract_series(
    task: &SeriesTask,
    response: &TimeSeriesResponse,
) -> Result<AttributeSeries, String> {
    let attribute = response.attribute(&task.attribute).ok_or_else(|| {
        format!(
            "response for {} does not contain attribute {}",
            task.collection, task.attribute
        )
    })?;

    let timeline = &response.result.timeline;
    if attribute.values.len() != timeline.len() {
        return Err(format!(
            "response for {} has {} values for {} timeline dates",
            task,
            attribute.values.len(),
            timeline.len()
        ));
    }

    Ok(AttributeSeries {
        collection: task.collection.clone(),
        attribute: task.attribute.clone(),
        dates: timeline
            .iter()
            .map(|d| iso_date_prefix(d).to_string())
            .collect(),
        values: attribute.values.clone(),
    })
}
