use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::records::{Cell, RecordSet};
use crate::validate::{coerce_cell, ColumnType, OPTIONAL_COLUMNS, REQUIRED_COLUMNS};

/// Normalize a validated record set: fill nulls in optional columns with the
/// column's most frequent value, coerce required columns to their declared
/// types, and drop exact-duplicate rows keeping first occurrences.
///
/// The input is left untouched; a cleaned copy is returned. Callers must
/// validate first: required columns that are missing or carry nulls here mean
/// the stages ran out of order, reported as a cleaning integrity error.
pub fn clean(records: &RecordSet) -> Result<RecordSet> {
    let mut required_idx: Vec<(usize, ColumnType)> = Vec::new();
    for (name, ty) in REQUIRED_COLUMNS {
        let idx = records.column_index(name).ok_or_else(|| {
            PipelineError::CleaningIntegrity(format!("required column '{name}' is absent"))
        })?;
        if records
            .rows
            .iter()
            .any(|row| row.get(idx).map_or(true, Cell::is_null))
        {
            return Err(PipelineError::CleaningIntegrity(format!(
                "required column '{name}' contains null values"
            )));
        }
        required_idx.push((idx, *ty));
    }

    let mut cleaned = records.clone();

    for name in OPTIONAL_COLUMNS {
        let Some(idx) = cleaned.column_index(name) else {
            continue;
        };
        if !cleaned.rows.iter().any(|row| row[idx].is_null()) {
            continue;
        }
        let fill = column_mode(&cleaned, idx).ok_or_else(|| {
            PipelineError::CleaningIntegrity(format!(
                "optional column '{name}' has no non-null values to fill from"
            ))
        })?;
        for row in &mut cleaned.rows {
            if row[idx].is_null() {
                row[idx] = fill.clone();
            }
        }
        debug!("filled nulls in '{}' with mode '{}'", name, fill.canonical());
    }

    for (idx, ty) in &required_idx {
        for row in &mut cleaned.rows {
            let coerced = coerce_cell(&row[*idx], *ty).ok_or_else(|| {
                PipelineError::CleaningIntegrity(format!(
                    "value '{}' in column '{}' is not coercible",
                    row[*idx].canonical(),
                    cleaned.columns[*idx]
                ))
            })?;
            row[*idx] = coerced;
        }
    }

    let before = cleaned.rows.len();
    let mut seen = HashSet::new();
    cleaned
        .rows
        .retain(|row| seen.insert(row.iter().map(Cell::canonical).collect::<Vec<_>>()));
    if cleaned.rows.len() < before {
        debug!("dropped {} duplicate rows", before - cleaned.rows.len());
    }

    Ok(cleaned)
}

/// Most frequent non-null value in a column; ties resolve to the smallest
/// canonical form. None when the column is entirely null.
fn column_mode(records: &RecordSet, idx: usize) -> Option<Cell> {
    let mut counts: HashMap<String, (usize, Cell)> = HashMap::new();
    for row in &records.rows {
        let cell = &row[idx];
        if cell.is_null() {
            continue;
        }
        counts
            .entry(cell.canonical())
            .or_insert_with(|| (0, cell.clone()))
            .0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(key_a, (count_a, _)), (key_b, (count_b, _))| {
            count_a.cmp(count_b).then_with(|| key_b.cmp(key_a))
        })
        .map(|(_, (_, cell))| cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn valid_set() -> RecordSet {
        RecordSet::from_csv(
            b"transaction_id,product_name,category,price,quantity,date,customer_name,customer_email\n\
              1,Widget,Tools,9.99,2,2024-03-01,Alice,alice@example.com\n\
              2,Gadget,Tools,19.99,1,2024-03-02,,alice@example.com\n\
              3,Widget,Tools,9.99,2,2024-03-01,Alice,alice@example.com\n\
              4,Doohickey,Tools,4.50,5,2024-03-03,Bob,bob@example.com\n",
        )
        .unwrap()
    }

    #[test]
    fn fills_optional_nulls_with_mode() {
        let records = RecordSet::from_csv(
            b"transaction_id,product_name,category,price,quantity,date,customer_name,customer_email\n\
              1,Widget,Tools,9.99,2,2024-03-01,A,a@example.com\n\
              2,Widget,Tools,9.99,1,2024-03-02,,a@example.com\n\
              3,Widget,Tools,9.99,1,2024-03-03,A,a@example.com\n\
              4,Widget,Tools,9.99,1,2024-03-04,B,a@example.com\n",
        )
        .unwrap();
        let cleaned = clean(&records).unwrap();
        let idx = cleaned.column_index("customer_name").unwrap();
        assert_eq!(cleaned.rows[1][idx], Cell::Text("A".to_string()));
    }

    #[test]
    fn coerces_required_columns_to_declared_types() {
        let cleaned = clean(&valid_set()).unwrap();
        let price = cleaned.column_index("price").unwrap();
        let date = cleaned.column_index("date").unwrap();
        let quantity = cleaned.column_index("quantity").unwrap();
        assert_eq!(cleaned.rows[0][price], Cell::Float(9.99));
        assert_eq!(
            cleaned.rows[0][date],
            Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert_eq!(cleaned.rows[0][quantity], Cell::Int(2));
    }

    #[test]
    fn drops_exact_duplicates_keeping_first() {
        let cleaned = clean(&valid_set()).unwrap();
        // Rows 1 and 3 of the input are identical after cleaning.
        assert_eq!(cleaned.rows.len(), 3);
        let id = cleaned.column_index("transaction_id").unwrap();
        assert_eq!(cleaned.rows[0][id], Cell::Int(1));
        assert_eq!(cleaned.rows[1][id], Cell::Int(2));
        assert_eq!(cleaned.rows[2][id], Cell::Int(4));
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean(&valid_set()).unwrap();
        let twice = clean(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn does_not_mutate_input() {
        let records = valid_set();
        let before = records.clone();
        clean(&records).unwrap();
        assert_eq!(records, before);
    }

    #[test]
    fn absent_optional_column_is_skipped() {
        let records = RecordSet::from_csv(
            b"transaction_id,product_name,category,price,quantity,date\n\
              1,Widget,Tools,9.99,2,2024-03-01\n",
        )
        .unwrap();
        let cleaned = clean(&records).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
    }

    #[test]
    fn entirely_null_optional_column_is_an_integrity_error() {
        let records = RecordSet::from_csv(
            b"transaction_id,product_name,category,price,quantity,date,customer_name\n\
              1,Widget,Tools,9.99,2,2024-03-01,\n",
        )
        .unwrap();
        let err = clean(&records).unwrap_err();
        assert!(matches!(err, PipelineError::CleaningIntegrity(_)));
    }

    #[test]
    fn null_in_required_column_is_an_integrity_error() {
        let records = RecordSet {
            columns: vec![
                "transaction_id".to_string(),
                "product_name".to_string(),
                "category".to_string(),
                "price".to_string(),
                "quantity".to_string(),
                "date".to_string(),
            ],
            rows: vec![vec![
                Cell::Int(1),
                Cell::Null,
                Cell::Text("Tools".to_string()),
                Cell::Float(9.99),
                Cell::Int(2),
                Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            ]],
        };
        let err = clean(&records).unwrap_err();
        assert!(matches!(err, PipelineError::CleaningIntegrity(_)));
    }
}
