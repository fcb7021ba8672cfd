//! Master timeline merging.
//!
//! Collections are acquired on different cadences, so series compared on one
//! chart rarely share a date axis. The merger builds the sorted union of all
//! dates and re-expresses every series against it, with `None` where a series
//! has no observation. Dates are ISO `YYYY-MM-DD`, so lexicographic order is
//! chronological order.

use std::collections::{BTreeSet, HashMap};

use crate::api::{AlignedSeries, AttributeSeries, MasterTimeline};

/// Sorted, de-duplicated union of the dates of `series`.
pub fn master_timeline(series: &[AttributeSeries]) -> MasterTimeline {
    let dates: BTreeSet<&str> = series
        .iter()
        .flat_map(|s| s.dates.iter().map(String::as_str))
        .collect();
    MasterTimeline::from_sorted(dates.into_iter().map(str::to_string).collect())
}

/// Re-express `series` against `timeline`.
///
/// If a date repeats inside `series`, its first value wins.
pub fn align(series: &AttributeSeries, timeline: &MasterTimeline) -> AlignedSeries {
    let mut lookup: HashMap<&str, Option<f64>> = HashMap::with_capacity(series.len());
    for (date, value) in series.dates.iter().zip(&series.values) {
        lookup.entry(date.as_str()).or_insert(*value);
    }

    AlignedSeries {
        collection: series.collection.clone(),
        values: timeline
            .dates()
            .iter()
            .map(|date| lookup.get(date.as_str()).copied().flatten())
            .collect(),
    }
}

/// Merge `series` onto one master timeline, keeping input order.
pub fn merge_timelines(series: &[AttributeSeries]) -> (MasterTimeline, Vec<AlignedSeries>) {
    let timeline = master_timeline(series);
    let aligned = series.iter().map(|s| align(s, &timeline)).collect();
    (timeline, aligned)
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod timeline_tests;
