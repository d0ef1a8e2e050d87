//! Type inference from JSON primitives
//!
//! Used for tables that keep the types the API already sends instead of a
//! name-based policy. Nested values are carried as JSON text.

use super::coerce::to_text;
use crate::types::JsonValue;
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, NullArray, StringArray};
use arrow::datatypes::DataType;
use std::sync::Arc;

/// Infer one Arrow type for a column of JSON values
pub(crate) fn infer_column_type(values: &[Option<&JsonValue>]) -> DataType {
    values
        .iter()
        .flatten()
        .map(|v| infer_type(v))
        .fold(DataType::Null, |acc, t| merge_types(&acc, &t))
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &JsonValue) -> DataType {
    match value {
        JsonValue::Null => DataType::Null,
        JsonValue::Bool(_) => DataType::Boolean,
        JsonValue::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        JsonValue::String(_) | JsonValue::Array(_) | JsonValue::Object(_) => DataType::Utf8,
    }
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        // Same types
        (a, b) if a == b => a.clone(),

        // Null can merge with anything
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        // Numbers can merge (prefer Float64 for mixed)
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        // Different types -> fall back to String (most flexible)
        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from JSON values of an inferred type
pub(crate) fn build_inferred_array(
    values: &[Option<&JsonValue>],
    data_type: &DataType,
) -> ArrayRef {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(JsonValue::as_bool)).collect();
            Arc::new(arr)
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(JsonValue::as_i64)).collect();
            Arc::new(arr)
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(JsonValue::as_f64)).collect();
            Arc::new(arr)
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| v.filter(|v| !v.is_null()).map(to_text))
                .collect();
            Arc::new(arr)
        }

        _ => Arc::new(NullArray::new(values.len())),
    }
}
