//! Table staging and Arrow conversion
//!
//! Raw CRM records are staged as ordered JSON rows in a [`RowSet`], then
//! converted into an Arrow `RecordBatch` either through a fixed
//! [`CoercionPolicy`] or by inferring types from the JSON primitives.
//!
//! # Overview
//!
//! - Nested objects are flattened with `_` as the path separator
//! - Column order is first-occurrence order across all rows
//! - An empty row set becomes a batch with zero rows and zero columns

mod coerce;
mod infer;
mod rows;

pub use coerce::{CoercionPolicy, ColumnKind};
pub use rows::{flatten_record, RowSet};

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// A batch with zero rows and zero columns
pub fn empty_batch() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::empty()))
}

/// Whether a batch has zero rows and zero columns
pub fn is_empty_shape(batch: &RecordBatch) -> bool {
    batch.num_rows() == 0 && batch.num_columns() == 0
}
