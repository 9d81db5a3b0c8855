use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{CpaError, Result};
use crate::schema::types::{FieldType, IdSubtype, NumericSubtype, TableMeta};
use crate::table::{RawTable, Value};

/// Formats tried, in order, for datetime fields without an explicit format.
const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Read a CSV stream (with header row) into a raw table.
///
/// Only the fields declared in `meta` are read, in declared order; extra
/// file columns are ignored. Empty cells become `Value::Null`.
pub fn read_csv_table<R: Read>(meta: &TableMeta, reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| load_error(meta, format!("reading header: {}", e)))?
        .clone();

    let mut positions = Vec::with_capacity(meta.fields.len());
    for field in &meta.fields {
        let position = headers
            .iter()
            .position(|h| h.trim() == field.name)
            .ok_or_else(|| CpaError::MissingColumn {
                table: meta.name.clone(),
                column: field.name.clone(),
            })?;
        positions.push(position);
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); meta.fields.len()];
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| load_error(meta, format!("row {}: {}", row + 1, e)))?;
        for (i, field) in meta.fields.iter().enumerate() {
            let cell = record.get(positions[i]).unwrap_or("");
            let value = parse_cell(cell, &field.field_type).map_err(|reason| {
                load_error(
                    meta,
                    format!("row {}, column '{}': {}", row + 1, field.name, reason),
                )
            })?;
            columns[i].push(value);
        }
    }

    RawTable::from_columns(
        meta.name.clone(),
        meta.fields
            .iter()
            .map(|f| f.name.clone())
            .zip(columns),
    )
}

fn load_error(meta: &TableMeta, message: String) -> CpaError {
    CpaError::Load {
        table: meta.name.clone(),
        message,
    }
}

/// Cast a single CSV cell according to its declared field type.
pub fn parse_cell(cell: &str, field_type: &FieldType) -> std::result::Result<Value, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Value::Null);
    }

    match field_type {
        FieldType::Id {
            subtype: IdSubtype::Integer,
            ..
        }
        | FieldType::Numerical {
            subtype: NumericSubtype::Integer,
        } => cell
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an integer", cell)),
        FieldType::Id {
            subtype: IdSubtype::String,
            ..
        }
        | FieldType::Categorical => Ok(Value::Text(cell.to_string())),
        FieldType::Numerical {
            subtype: NumericSubtype::Float,
        } => cell
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("'{}' is not a number", cell)),
        FieldType::Boolean => match cell.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", cell)),
        },
        FieldType::Datetime { format } => parse_datetime(cell, format.as_deref()).map(Value::Timestamp),
    }
}

fn parse_datetime(cell: &str, format: Option<&str>) -> std::result::Result<NaiveDateTime, String> {
    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(cell, format)
            .or_else(|_| {
                NaiveDate::parse_from_str(cell, format)
                    .map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
            .map_err(|e| format!("'{}' does not match '{}': {}", cell, format, e));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Ok(dt.naive_utc());
    }
    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| format!("'{}' is not a recognised datetime", cell))
}
