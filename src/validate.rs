use chrono::NaiveDate;
use tracing::debug;

use crate::records::{Cell, RecordSet};

/// Declared type of a required column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Date,
}

/// The contract every incoming file must satisfy.
pub const REQUIRED_COLUMNS: &[(&str, ColumnType)] = &[
    ("transaction_id", ColumnType::Int),
    ("product_name", ColumnType::Text),
    ("category", ColumnType::Text),
    ("price", ColumnType::Float),
    ("quantity", ColumnType::Int),
    ("date", ColumnType::Date),
];

/// Nullable columns filled during cleaning rather than validated.
pub const OPTIONAL_COLUMNS: &[&str] = &["customer_name", "customer_email"];

/// Check a record set against the required-column contract.
///
/// Returns false rather than raising: a missing required column, a null in
/// any required field, or a value that cannot be coerced to the declared type
/// all fail the set. Coercion is attempted on working values only; the
/// caller's data is never mutated.
pub fn validate(records: &RecordSet) -> bool {
    for (name, _) in REQUIRED_COLUMNS {
        if !records.has_column(name) {
            debug!("validation failed: required column '{}' is absent", name);
            return false;
        }
    }

    for (name, ty) in REQUIRED_COLUMNS {
        let idx = match records.column_index(name) {
            Some(idx) => idx,
            None => return false,
        };
        for (row_no, row) in records.rows.iter().enumerate() {
            match row.get(idx) {
                None | Some(Cell::Null) => {
                    debug!(
                        "validation failed: null in required column '{}' at row {}",
                        name, row_no
                    );
                    return false;
                }
                Some(cell) => {
                    if coerce_cell(cell, *ty).is_none() {
                        debug!(
                            "validation failed: '{}' in column '{}' is not coercible",
                            cell.canonical(),
                            name
                        );
                        return false;
                    }
                }
            }
        }
    }

    true
}

/// Coerce a single cell to the declared column type, or None if it cannot be
/// represented.
pub fn coerce_cell(cell: &Cell, ty: ColumnType) -> Option<Cell> {
    match (ty, cell) {
        (_, Cell::Null) => None,
        (ColumnType::Int, Cell::Int(v)) => Some(Cell::Int(*v)),
        (ColumnType::Int, Cell::Float(v)) if v.fract() == 0.0 => Some(Cell::Int(*v as i64)),
        (ColumnType::Int, Cell::Text(s)) => parse_int(s).map(Cell::Int),
        (ColumnType::Float, Cell::Float(v)) => Some(Cell::Float(*v)),
        (ColumnType::Float, Cell::Int(v)) => Some(Cell::Float(*v as f64)),
        (ColumnType::Float, Cell::Text(s)) => parse_float(s).map(Cell::Float),
        (ColumnType::Text, Cell::Text(s)) => Some(Cell::Text(s.clone())),
        (ColumnType::Text, other) => Some(Cell::Text(other.canonical())),
        (ColumnType::Date, Cell::Date(d)) => Some(Cell::Date(*d)),
        (ColumnType::Date, Cell::Text(s)) => parse_date(s).map(Cell::Date),
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    // Integer-valued floats ("3.0") count, matching the permissive cast the
    // upstream producers rely on.
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m-%d-%Y"))
        .ok()
}
