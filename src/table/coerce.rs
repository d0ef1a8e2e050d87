//! Column coercion policy
//!
//! CRM payloads are loosely typed. Every column gets a fixed kind decided by
//! its name alone, and every value is coerced to that kind.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;

const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "closed_at", "last_login"];
const INTEGER_COLUMNS: &[&str] = &["order"];
const BOOLEAN_COLUMNS: &[&str] = &["required", "allow_new", "active", "hidden", "visible", "win"];
const FLOAT_COLUMNS: &[&str] = &["base_price", "amount_montly", "amount_unique", "amount_total"];

const DEAL_TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "closed_at"];
const DEAL_FLOAT_COLUMNS: &[&str] = &["amount_montly", "amount_unique", "amount_total"];

/// Target kind of a coerced column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// UTC timestamp, microsecond precision
    Timestamp,
    /// 64-bit signed integer
    Integer,
    /// Boolean
    Boolean,
    /// 64-bit float
    Float,
    /// UTF-8 text
    Text,
}

impl ColumnKind {
    /// Arrow data type for this kind
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnKind::Timestamp => {
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
            }
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Text => DataType::Utf8,
        }
    }
}

/// Which name → kind mapping to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Shared policy for every non-deal resource
    #[default]
    Resource,
    /// Flattened deals: custom fields always stay text
    Deal,
}

impl CoercionPolicy {
    /// Kind of the named column under this policy
    pub fn kind_for(&self, column: &str) -> ColumnKind {
        match self {
            CoercionPolicy::Resource => {
                if TIMESTAMP_COLUMNS.contains(&column) {
                    ColumnKind::Timestamp
                } else if INTEGER_COLUMNS.contains(&column) {
                    ColumnKind::Integer
                } else if BOOLEAN_COLUMNS.contains(&column) {
                    ColumnKind::Boolean
                } else if FLOAT_COLUMNS.contains(&column) {
                    ColumnKind::Float
                } else {
                    ColumnKind::Text
                }
            }
            CoercionPolicy::Deal => {
                if DEAL_TIMESTAMP_COLUMNS.contains(&column) {
                    ColumnKind::Timestamp
                } else if column == "win" {
                    ColumnKind::Boolean
                } else if DEAL_FLOAT_COLUMNS.contains(&column) {
                    ColumnKind::Float
                } else {
                    ColumnKind::Text
                }
            }
        }
    }
}

/// Build an Arrow array of the given kind; `None` and JSON null become null
pub(crate) fn build_array(
    column: &str,
    kind: ColumnKind,
    values: &[Option<&JsonValue>],
) -> Result<ArrayRef> {
    match kind {
        ColumnKind::Timestamp => {
            let micros = coerce_column(column, values, to_timestamp_micros)?;
            Ok(Arc::new(
                TimestampMicrosecondArray::from(micros).with_timezone("UTC"),
            ))
        }
        ColumnKind::Integer => Ok(Arc::new(Int64Array::from(coerce_column(
            column, values, to_integer,
        )?))),
        ColumnKind::Boolean => Ok(Arc::new(BooleanArray::from(coerce_column(
            column, values, to_boolean,
        )?))),
        ColumnKind::Float => Ok(Arc::new(Float64Array::from(coerce_column(
            column, values, to_float,
        )?))),
        ColumnKind::Text => {
            let text: Vec<Option<String>> = values
                .iter()
                .map(|v| v.filter(|v| !v.is_null()).map(to_text))
                .collect();
            Ok(Arc::new(StringArray::from(text)))
        }
    }
}

fn coerce_column<T>(
    column: &str,
    values: &[Option<&JsonValue>],
    convert: fn(&str, &JsonValue) -> Result<Option<T>>,
) -> Result<Vec<Option<T>>> {
    values
        .iter()
        .map(|v| match v {
            Some(v) if !v.is_null() => convert(column, v),
            _ => Ok(None),
        })
        .collect()
}

/// Parse the timestamp shapes the CRM emits into UTC
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn to_timestamp_micros(column: &str, value: &JsonValue) -> Result<Option<i64>> {
    match value {
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => parse_timestamp(s.trim())
            .map(|dt| Some(dt.timestamp_micros()))
            .ok_or_else(|| Error::coercion(column, format!("'{s}' is not a timestamp"))),
        other => Err(Error::coercion(
            column,
            format!("expected a timestamp string, got {other}"),
        )),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_integer(column: &str, value: &JsonValue) -> Result<Option<i64>> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(Error::coercion(column, format!("{n} is not an integer"))),
            }
        }
        JsonValue::Bool(b) => Ok(Some(i64::from(*b))),
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::coercion(column, format!("'{s}' is not an integer"))),
        other => Err(Error::coercion(column, format!("{other} is not an integer"))),
    }
}

fn to_boolean(column: &str, value: &JsonValue) -> Result<Option<bool>> {
    match value {
        JsonValue::Bool(b) => Ok(Some(*b)),
        JsonValue::Number(n) => Ok(Some(n.as_f64().is_some_and(|f| f != 0.0))),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(Error::coercion(column, format!("'{s}' is not a boolean"))),
        },
        other => Err(Error::coercion(column, format!("{other} is not a boolean"))),
    }
}

fn to_float(column: &str, value: &JsonValue) -> Result<Option<f64>> {
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::coercion(column, format!("{n} is not a number"))),
        JsonValue::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::coercion(column, format!("'{s}' is not a number"))),
        other => Err(Error::coercion(column, format!("{other} is not a number"))),
    }
}

/// Text form of a JSON value: strings verbatim, everything else as JSON
pub(crate) fn to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
