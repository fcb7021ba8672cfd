//! Background comparison processing.
//!
//! Runs a [`ComparisonPlan`] through the pipeline as a spawned task, emitting
//! progress logs to the [`ComparisonTracker`] so clients can follow it via SSE.
//! A watcher task marks the session failed if the worker dies, so followers
//! never wait on a session stuck in `running`.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::services::comparison::{run_comparison, ComparisonOutcome, ComparisonPlan};
use crate::services::comparison_tracker::{ComparisonTracker, LogLevel};
use crate::services::fetcher::SequentialFetcher;
use crate::services::scaling::ScalePolicy;
use crate::services::throttle::Throttle;
use crate::upstream::DataCubeClient;

/// Fetch, align and store one comparison.
///
/// Designed to be spawned: the outcome lands in the tracker. If the session
/// is removed while running, the remaining tasks still run and the result is
/// dropped.
pub async fn process_comparison_async(
    comparison_id: String,
    tracker: ComparisonTracker,
    client: Arc<dyn DataCubeClient>,
    policy: ScalePolicy,
    throttle_interval: Duration,
    plan: ComparisonPlan,
) -> ComparisonOutcome {
    tracker.log(
        &comparison_id,
        LogLevel::Info,
        format!(
            "Comparing {} at {} ({})",
            plan.collections.join(", "),
            plan.point,
            plan.window
        ),
    );
    tracker.log(
        &comparison_id,
        LogLevel::Info,
        format!(
            "Fetching {} time series one at a time, {} ms apart...",
            plan.tasks.len(),
            throttle_interval.as_millis()
        ),
    );

    let mut fetcher = SequentialFetcher::new(client, policy, Throttle::new(throttle_interval));
    let result = run_comparison(&mut fetcher, &plan, |progress| {
        tracker.record_progress(&comparison_id, progress)
    })
    .await;

    let outcome = result.outcome();
    log::info!(
        "Comparison {} finished as {:?}: {}",
        comparison_id,
        outcome,
        result.summary()
    );
    tracker.finish(&comparison_id, result);
    outcome
}

/// Spawn [`process_comparison_async`] together with its watcher.
///
/// The returned handle resolves once the worker has ended, one way or another.
pub fn spawn_comparison(
    comparison_id: String,
    tracker: ComparisonTracker,
    client: Arc<dyn DataCubeClient>,
    policy: ScalePolicy,
    throttle_interval: Duration,
    plan: ComparisonPlan,
) -> JoinHandle<()> {
    let worker = tokio::spawn(process_comparison_async(
        comparison_id.clone(),
        tracker.clone(),
        client,
        policy,
        throttle_interval,
        plan,
    ));
    tokio::spawn(watch_comparison(comparison_id, tracker, worker))
}

/// Wait for a comparison worker and record a panic or cancellation as a failure.
pub async fn watch_comparison(
    comparison_id: String,
    tracker: ComparisonTracker,
    worker: JoinHandle<ComparisonOutcome>,
) {
    if let Err(err) = worker.await {
        log::error!("Comparison {} worker stopped: {}", comparison_id, err);
        tracker.fail(&comparison_id, format!("Comparison stopped unexpectedly: {}", err));
    }
}
