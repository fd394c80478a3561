use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Field lexemes the reader treats as missing values, compared after trimming
/// and lowercasing.
const NULL_LEXEMES: &[&str] = &["", "na", "nan", "null"];

/// A single typed cell within a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Decode a raw CSV field. Typing beyond null detection happens later,
    /// during coercion.
    pub fn from_field(field: &str) -> Cell {
        let lowered = field.trim().to_lowercase();
        if NULL_LEXEMES.contains(&lowered.as_str()) {
            Cell::Null
        } else {
            Cell::Text(field.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Canonical string form, used for CSV output and exact row identity.
    pub fn canonical(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Text(v) => v.clone(),
            Cell::Date(v) => v.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Int(v) => serde_json::Value::from(*v),
            Cell::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Cell::Text(v) => serde_json::Value::from(v.clone()),
            Cell::Date(v) => serde_json::Value::from(v.format("%Y-%m-%d").to_string()),
        }
    }
}

/// In-memory tabular representation of one file: a header row naming the
/// columns and the data rows beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Decode comma-delimited bytes with a header row. Ragged rows fail the
    /// whole set.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::from_field).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Serialize to CSV text with a header row, cells in canonical form.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::canonical))?;
        }

        let bytes = writer.into_inner().map_err(|e| PipelineError::Storage {
            message: format!("flushing CSV buffer: {e}"),
        })?;
        String::from_utf8(bytes).map_err(|e| PipelineError::Storage {
            message: format!("CSV output was not UTF-8: {e}"),
        })
    }
}
