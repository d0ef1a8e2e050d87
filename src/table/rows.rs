//! Ordered JSON row staging

use super::coerce::{build_array, CoercionPolicy};
use super::infer::{build_inferred_array, infer_column_type};
use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::HashSet;
use std::sync::Arc;

/// Flatten one JSON record into a single-level object
///
/// Nested object keys are joined with `_` (`deal_pipeline.name` becomes
/// `deal_pipeline_name`). Arrays are kept as values. An empty nested object
/// becomes a null under its own key.
pub fn flatten_record(value: &JsonValue) -> JsonObject {
    let mut out = JsonObject::new();
    match value {
        JsonValue::Object(obj) => flatten_into(&mut out, None, obj),
        other => {
            out.insert("value".to_string(), other.clone());
        }
    }
    out
}

fn flatten_into(out: &mut JsonObject, prefix: Option<&str>, obj: &JsonObject) {
    for (key, value) in obj {
        let name = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(inner) if !inner.is_empty() => {
                flatten_into(out, Some(&name), inner);
            }
            JsonValue::Object(_) => {
                out.insert(name, JsonValue::Null);
            }
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

/// Rectangular staging area for rows with a dynamic column set
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<JsonObject>,
}

impl RowSet {
    /// Create an empty row set
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten and stage raw JSON records
    pub fn from_records(records: &[JsonValue]) -> Self {
        let mut set = Self::new();
        for record in records {
            set.push(flatten_record(record));
        }
        set
    }

    /// Stage already-flat rows
    pub fn from_rows(rows: impl IntoIterator<Item = JsonObject>) -> Self {
        let mut set = Self::new();
        for row in rows {
            set.push(row);
        }
        set
    }

    /// Append a row, registering any new columns
    pub fn push(&mut self, row: JsonObject) {
        for key in row.keys() {
            if self.seen.insert(key.clone()) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append every row of another set
    pub fn extend(&mut self, other: RowSet) {
        for row in other.rows {
            self.push(row);
        }
    }

    /// Column names in first-occurrence order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Staged rows
    pub fn rows(&self) -> &[JsonObject] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove a column and its values; unknown names are ignored
    pub fn drop_column(&mut self, name: &str) {
        if !self.seen.remove(name) {
            return;
        }
        self.columns.retain(|c| c != name);
        for row in &mut self.rows {
            row.shift_remove(name);
        }
    }

    /// Keep only columns accepted by the predicate
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&RowSet, &str) -> bool) {
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !keep(self, c))
            .cloned()
            .collect();
        for name in dropped {
            self.drop_column(&name);
        }
    }

    /// Project onto a fixed column list, in that order
    ///
    /// Columns missing from the staged rows are kept and filled with nulls.
    /// Projecting an empty set yields an empty set with no columns.
    pub fn select(&self, columns: &[&str]) -> RowSet {
        if self.rows.is_empty() {
            return RowSet::new();
        }
        let rows = self.rows.iter().map(|row| {
            columns
                .iter()
                .map(|c| {
                    (
                        (*c).to_string(),
                        row.get(*c).cloned().unwrap_or(JsonValue::Null),
                    )
                })
                .collect::<JsonObject>()
        });
        RowSet::from_rows(rows)
    }

    /// Whether every row holds null (or nothing) for a column
    pub fn column_is_all_null(&self, name: &str) -> bool {
        self.rows
            .iter()
            .all(|row| row.get(name).map_or(true, JsonValue::is_null))
    }

    /// Values of one column, `None` where a row lacks the key
    fn column_values<'a>(&'a self, name: &str) -> Vec<Option<&'a JsonValue>> {
        self.rows.iter().map(|row| row.get(name)).collect()
    }

    /// Convert into a RecordBatch using a fixed coercion policy
    pub fn to_record_batch(&self, policy: CoercionPolicy) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let kind = policy.kind_for(name);
            let values = self.column_values(name);
            arrays.push(build_array(name, kind, &values)?);
            fields.push(Field::new(name, kind.data_type(), true));
        }

        self.finish(fields, arrays)
    }

    /// Convert into a RecordBatch with types inferred from the JSON values
    pub fn to_inferred_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let values = self.column_values(name);
            let data_type = infer_column_type(&values);
            arrays.push(build_inferred_array(&values, &data_type));
            fields.push(Field::new(name, data_type, true));
        }

        self.finish(fields, arrays)
    }

    fn finish(&self, fields: Vec<Field>, arrays: Vec<ArrayRef>) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(self.rows.len()));
        Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
    }
}
