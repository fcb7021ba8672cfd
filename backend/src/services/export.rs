//! Spreadsheet export of aligned comparisons.
//!
//! Each [`ExportSheet`] holds one attribute compared across collections and
//! becomes one workbook tab:
//!
//! ```text
//! row 1  title
//! row 2  point and period
//! row 3  scaling note
//! row 5  Date | <collection> | <collection> ...
//! row 6+ one row per master timeline date, blank where a series has no value
//! ```

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::api::{AlignedSeries, AttributeSeries, Coordinates, DateWindow, MasterTimeline};
use crate::services::timeline::merge_timelines;

/// Longest tab name the xlsx format accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER_ROW: u32 = 4;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No time series available to export")]
    NoData,

    #[error("Failed to write workbook: {0}")]
    Workbook(#[from] XlsxError),
}

/// One attribute's aligned comparison, destined for one tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSheet {
    pub attribute: String,
    pub point: Coordinates,
    pub window: DateWindow,
    /// Factor applied to the raw values, if any.
    pub scale_factor: Option<f64>,
    pub timeline: MasterTimeline,
    pub series: Vec<AlignedSeries>,
}

/// A single cell of the data block.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Blank,
        }
    }
}

impl ExportSheet {
    /// Merge the series of one attribute onto a master timeline.
    pub fn build(
        attribute: impl Into<String>,
        series: &[AttributeSeries],
        point: Coordinates,
        window: DateWindow,
        scale_factor: Option<f64>,
    ) -> Self {
        let (timeline, series) = merge_timelines(series);
        Self {
            attribute: attribute.into(),
            point,
            window,
            scale_factor,
            timeline,
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn title(&self) -> String {
        format!("{} time series comparison", self.attribute)
    }

    pub fn metadata_line(&self) -> String {
        format!("Point: {} | Period: {}", self.point, self.window)
    }

    pub fn note(&self) -> String {
        match self.scale_factor {
            Some(factor) => format!(
                "Values were integer-encoded upstream and have been multiplied by {}.",
                factor
            ),
            None => "Values are shown as delivered by the time-series service (not rescaled)."
                .to_string(),
        }
    }

    /// `Date` followed by one column per collection.
    pub fn header(&self) -> Vec<String> {
        std::iter::once("Date".to_string())
            .chain(self.series.iter().map(|s| s.collection.clone()))
            .collect()
    }

    /// Header row plus one row per master date.
    pub fn data_block(&self) -> Vec<Vec<Cell>> {
        let header = self.header().into_iter().map(Cell::Text).collect();
        let rows = self.timeline.dates().iter().enumerate().map(|(idx, date)| {
            std::iter::once(Cell::Text(date.clone()))
                .chain(
                    self.series
                        .iter()
                        .map(|s| Cell::from(s.values.get(idx).copied().flatten())),
                )
                .collect()
        });
        std::iter::once(header).chain(rows).collect()
    }
}

/// Make `raw` a legal tab name: invalid characters replaced, length capped.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    if cleaned.is_empty() {
        return "Sheet".to_string();
    }
    truncate_chars(cleaned, MAX_SHEET_NAME_LEN)
}

/// Sanitized tab names, made unique (case-insensitively) with a ` (n)` suffix.
pub fn sheet_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .into_iter()
        .map(|raw| {
            let base = sanitize_sheet_name(raw);
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.to_lowercase()) {
                let suffix = format!(" ({})", n);
                candidate = format!(
                    "{}{}",
                    truncate_chars(&base, MAX_SHEET_NAME_LEN - suffix.len()),
                    suffix
                );
                n += 1;
            }
            candidate
        })
        .collect()
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Download name stamped with the export date.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("geoinsight_time_series_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Serialize the non-empty sheets into an xlsx workbook.
pub fn write_workbook(sheets: &[ExportSheet]) -> Result<Vec<u8>, ExportError> {
    let sheets: Vec<&ExportSheet> = sheets.iter().filter(|s| !s.is_empty()).collect();
    if sheets.is_empty() {
        return Err(ExportError::NoData);
    }

    let title_format = Format::new().set_bold().set_font_size(14);
    let header_format = Format::new().set_bold().set_background_color(Color::RGB(0xDDEBF7));
    let note_format = Format::new().set_italic();
    let value_format = Format::new().set_num_format("0.0000");

    let names = sheet_names(sheets.iter().map(|s| s.attribute.as_str()));
    let mut workbook = Workbook::new();

    for (sheet, name) in sheets.iter().zip(&names) {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        worksheet.write_string_with_format(0, 0, sheet.title(), &title_format)?;
        worksheet.write_string(1, 0, sheet.metadata_line())?;
        worksheet.write_string_with_format(2, 0, sheet.note(), &note_format)?;

        for (r, row) in sheet.data_block().iter().enumerate() {
            let row_idx = HEADER_ROW + r as u32;
            for (c, cell) in row.iter().enumerate() {
                let col = c as u16;
                match cell {
                    Cell::Text(text) if r == 0 => {
                        worksheet.write_string_with_format(row_idx, col, text, &header_format)?;
                    }
                    Cell::Text(text) => {
                        worksheet.write_string(row_idx, col, text)?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number_with_format(row_idx, col, *value, &value_format)?;
                    }
                    Cell::Blank => {}
                }
            }
        }

        worksheet.set_column_width(0, 12)?;
        for c in 1..=sheet.series.len() {
            worksheet.set_column_width(c as u16, 16)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
