//! Chart-ready view of an [`ExportSheet`].

use serde::Serialize;

use crate::services::export::ExportSheet;

/// One line per collection over the shared date labels; `null` marks a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub attribute: String,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
}

impl From<&ExportSheet> for ChartData {
    fn from(sheet: &ExportSheet) -> Self {
        Self {
            attribute: sheet.attribute.clone(),
            title: sheet.title(),
            labels: sheet.timeline.dates().to_vec(),
            datasets: sheet
                .series
                .iter()
                .map(|s| ChartDataset {
                    label: s.collection.clone(),
                    data: s
                        .values
                        .iter()
                        .map(|v| v.filter(|x| x.is_finite()))
                        .collect(),
                })
                .collect(),
        }
    }
}
