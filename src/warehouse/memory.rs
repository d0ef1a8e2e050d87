//! In-process warehouse

use super::types::{TableRef, WriteSummary};
use super::Warehouse;
use crate::error::{Error, Result};
use crate::table::is_empty_shape;
use crate::types::WriteMode;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One write as seen by [`MemoryWarehouse`]
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    /// Destination as requested
    pub destination: String,
    /// Mode used
    pub mode: WriteMode,
    /// Batch written
    pub batch: RecordBatch,
}

#[derive(Debug, Default)]
struct State {
    writes: Vec<RecordedWrite>,
    tables: HashMap<String, Vec<RecordBatch>>,
}

/// Keeps every table in memory and records the write log
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    state: Mutex<State>,
}

impl MemoryWarehouse {
    /// Create an empty warehouse
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::warehouse("memory", "state lock poisoned"))
    }

    /// Every write so far, in call order
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().map(|s| s.writes.clone()).unwrap_or_default()
    }

    /// Current batches of a table, keyed by `namespace.table`
    pub fn table(&self, name: &str) -> Option<Vec<RecordBatch>> {
        self.state().ok()?.tables.get(name).cloned()
    }

    /// Total rows currently held for a table
    pub fn row_count(&self, name: &str) -> usize {
        self.table(name)
            .map(|batches| batches.iter().map(RecordBatch::num_rows).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn write_table(
        &self,
        destination: &str,
        batch: &RecordBatch,
        mode: WriteMode,
    ) -> Result<WriteSummary> {
        let key = TableRef::parse(destination)?.to_string();
        let mut state = self.state()?;

        state.writes.push(RecordedWrite {
            destination: destination.to_string(),
            mode,
            batch: batch.clone(),
        });

        let parts = state.tables.entry(key).or_default();
        if mode == WriteMode::Truncate {
            parts.clear();
        }
        if !is_empty_shape(batch) {
            parts.push(batch.clone());
        }

        Ok(WriteSummary::new(
            destination,
            mode,
            batch.num_rows(),
            batch.num_columns(),
        ))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
