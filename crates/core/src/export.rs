//! CSV and JSON export of a filtered violation list.
//!
//! CSV cells are joined with bare commas. Values containing commas are not
//! quoted, matching the format downstream spreadsheets already ingest.

use chrono::NaiveDate;
use compliance_common::{AppError, AppResult};
use serde::Deserialize;

use crate::model::Violation;

/// CSV header row.
pub const CSV_HEADERS: [&str; 9] = [
    "ID",
    "Student ID",
    "Student Name",
    "Department",
    "Category",
    "Status",
    "Priority",
    "Created Date",
    "Due Date",
];

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// File extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// MIME type of the body.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

/// A rendered export ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Download name for an export produced on `today`.
#[must_use]
pub fn filename(format: ExportFormat, today: NaiveDate) -> String {
    format!(
        "compliance-report-{}.{}",
        today.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Header row plus one line per record.
#[must_use]
pub fn to_csv(records: &[Violation]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for v in records {
        lines.push(
            [
                v.id.as_str(),
                v.student_id.as_str(),
                v.student_name.as_str(),
                v.department.as_str(),
                v.category.label(),
                v.status.as_str(),
                v.priority.as_str(),
                &v.created_at.date_naive().format("%Y-%m-%d").to_string(),
                &v.due_date.format("%Y-%m-%d").to_string(),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

/// Pretty-printed JSON array of the records.
pub fn to_json(records: &[Violation]) -> AppResult<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| AppError::Internal(format!("Failed to serialize export: {e}")))
}

/// Render `records` in `format`.
pub fn render(records: &[Violation], format: ExportFormat, today: NaiveDate) -> AppResult<Export> {
    let body = match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => to_json(records)?,
    };

    Ok(Export {
        filename: filename(format, today),
        content_type: format.content_type(),
        body,
    })
}
