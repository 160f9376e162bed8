use crate::data::query_result::{display_value, Row, StatementResult};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Markdown => "Markdown",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            other => Err(anyhow!("Unknown export format '{}' (use csv, json or md)", other)),
        }
    }
}

/// Converts the displayed rows into text artifacts.
///
/// All formatters take the rows of the displayed statement plus the column
/// order used on screen, so exports match what the operator sees.
pub struct DataExporter;

impl DataExporter {
    pub fn export(
        format: ExportFormat,
        rows: &StatementResult,
        columns: &[String],
    ) -> Result<String> {
        match format {
            ExportFormat::Csv => Self::to_csv(rows, columns),
            ExportFormat::Json => Self::to_json(rows, columns),
            ExportFormat::Markdown => Ok(Self::to_markdown(rows, columns)),
        }
    }

    /// RFC 4180 CSV. Null and missing values become empty fields.
    pub fn to_csv(rows: &StatementResult, columns: &[String]) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }

        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        wtr.write_record(columns)?;
        for row in &rows.rows {
            let record: Vec<String> = columns.iter().map(|col| Self::csv_field(row, col)).collect();
            wtr.write_record(&record)?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV output: {}", e))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Pretty-printed array of objects keyed in display order
    pub fn to_json(rows: &StatementResult, columns: &[String]) -> Result<String> {
        let objects: Vec<Value> = rows
            .rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for col in columns {
                    obj.insert(col.clone(), row.get(col).cloned().unwrap_or(Value::Null));
                }
                Value::Object(obj)
            })
            .collect();

        Ok(serde_json::to_string_pretty(&objects)?)
    }

    pub fn to_markdown(rows: &StatementResult, columns: &[String]) -> String {
        if columns.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        let header: Vec<String> = columns.iter().map(|c| Self::escape_markdown_cell(c)).collect();
        out.push_str(&format!("| {} |\n", header.join(" | ")));

        let separator: Vec<&str> = columns.iter().map(|_| "---").collect();
        out.push_str(&format!("| {} |\n", separator.join(" | ")));

        for row in &rows.rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|col| Self::escape_markdown_cell(&display_value(row.get(col))))
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }

        out
    }

    /// Write an artifact to `path`, or to a timestamped file in `dir`
    pub fn write_to_file(
        format: ExportFormat,
        content: &str,
        path: Option<&Path>,
        dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let base = dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
                base.join(Self::default_filename(format))
            }
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!("Exported {} to {}", format, target.display());
        Ok(target)
    }

    pub fn default_filename(format: ExportFormat) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        format!("query_results_{}.{}", timestamp, format.extension())
    }

    fn csv_field(row: &Row, column: &str) -> String {
        match row.get(column) {
            None | Some(Value::Null) => String::new(),
            value => display_value(value),
        }
    }

    fn escape_markdown_cell(text: &str) -> String {
        text.replace('|', "\\|").replace("\r\n", " ").replace('\n', " ")
    }
}
