//! # Column Transformation
//!
//! Turns a raw table into the numeric-only frame that models are fit on.
//! Identifier columns are dropped; every other declared field becomes one
//! numeric column with nulls kept as missing cells:
//!
//! | field type    | encoding                                              |
//! |---------------|-------------------------------------------------------|
//! | `numerical`   | value as `f64`                                        |
//! | `boolean`     | `1.0` / `0.0`                                         |
//! | `datetime`    | seconds since the Unix epoch                          |
//! | `categorical` | midpoint of the category's frequency interval in [0, 1] |

use indexmap::IndexMap;

use crate::error::{CpaError, Result};
use crate::schema::types::{FieldType, TableMeta};
use crate::table::{Column, Frame, RawTable, Value};

/// Transform `raw` according to the field declarations in `meta`.
pub fn transform_table(meta: &TableMeta, raw: &RawTable) -> Result<Frame> {
    let mut frame = Frame::new(meta.name.clone(), raw.len());

    for field in &meta.fields {
        if field.field_type.is_id() {
            continue;
        }
        let values = raw.column(&field.name).ok_or_else(|| CpaError::MissingColumn {
            table: meta.name.clone(),
            column: field.name.clone(),
        })?;

        let cells = match &field.field_type {
            FieldType::Numerical { .. } => encode_with(values, numeric_cell),
            FieldType::Boolean => encode_with(values, boolean_cell),
            FieldType::Datetime { .. } => encode_with(values, datetime_cell),
            FieldType::Categorical => Ok(encode_categorical(values)),
            FieldType::Id { .. } => continue,
        }
        .map_err(|(row, value)| {
            CpaError::shape(
                &meta.name,
                format!(
                    "column '{}' ({}) row {}: cannot encode {} value",
                    field.name,
                    field.field_type,
                    row,
                    value.type_name()
                ),
            )
        })?;

        frame.push_column(field.name.clone(), Column::Numeric(cells))?;
    }

    Ok(frame)
}

type Encoded = std::result::Result<Vec<Option<f64>>, (usize, Value)>;

fn encode_with(values: &[Value], cell: fn(&Value) -> Option<Option<f64>>) -> Encoded {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| cell(value).ok_or_else(|| (row, value.clone())))
        .collect()
}

// Each encoder returns `None` for a value it cannot encode and `Some(None)`
// for a null.

fn numeric_cell(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Int(i) => Some(Some(*i as f64)),
        Value::Float(f) if f.is_nan() => Some(None),
        Value::Float(f) => Some(Some(*f)),
        _ => None,
    }
}

fn boolean_cell(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Bool(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        Value::Int(0) => Some(Some(0.0)),
        Value::Int(1) => Some(Some(1.0)),
        _ => None,
    }
}

fn datetime_cell(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Timestamp(ts) => Some(Some(ts.and_utc().timestamp() as f64)),
        _ => None,
    }
}

/// Encode categories as the midpoint of their frequency interval.
///
/// Categories are laid out on [0, 1] from most to least frequent (ties keep
/// first-occurrence order), each taking a share proportional to its count.
pub fn encode_categorical(values: &[Value]) -> Vec<Option<f64>> {
    let codes = category_codes(values);
    values
        .iter()
        .map(|v| category_label(v).and_then(|label| codes.get(&label).copied()))
        .collect()
}

/// Category label → encoded value.
pub fn category_codes(values: &[Value]) -> IndexMap<String, f64> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for label in values.iter().filter_map(category_label) {
        *counts.entry(label).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();

    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    // Stable sort keeps first-occurrence order among equal counts.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut codes = IndexMap::with_capacity(ordered.len());
    let mut start = 0usize;
    for (label, count) in ordered {
        let midpoint = (start as f64 + count as f64 / 2.0) / total as f64;
        codes.insert(label, midpoint);
        start += count;
    }
    codes
}

fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Timestamp(ts) => Some(ts.to_string()),
    }
}
