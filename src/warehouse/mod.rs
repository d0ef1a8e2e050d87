//! Warehouse loading
//!
//! A [`Warehouse`] accepts one Arrow table per call and writes it to a dotted
//! destination such as `project.dataset.table`. Only the last two segments
//! matter: they name the namespace and the table.
//!
//! # Implementations
//!
//! - [`DuckDbWarehouse`]: DuckDB database file or in-memory database
//! - [`ObjectStoreWarehouse`]: Parquet files on a local path or cloud bucket
//! - [`MemoryWarehouse`]: in-process, used for dry runs and tests

mod duck;
mod memory;
mod object;
mod parquet_io;
mod types;

pub use duck::DuckDbWarehouse;
pub use memory::{MemoryWarehouse, RecordedWrite};
pub use object::ObjectStoreWarehouse;
pub use parquet_io::encode_parquet;
pub use types::{TableRef, WriteSummary};

use crate::error::{Error, Result};
use crate::types::WriteMode;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::sync::Arc;

/// Destination for resource tables
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Write one table, replacing or appending per `mode`
    ///
    /// Returns once the destination has accepted the write.
    async fn write_table(
        &self,
        destination: &str,
        batch: &RecordBatch,
        mode: WriteMode,
    ) -> Result<WriteSummary>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Open a warehouse from a location string
///
/// - `memory` : in-process [`MemoryWarehouse`]
/// - `duckdb://:memory:` or `duckdb:///path/to/file.duckdb` : [`DuckDbWarehouse`]
/// - anything else (`s3://`, `r2://`, `gs://`, `az://`, local path) : [`ObjectStoreWarehouse`]
pub fn open(location: &str) -> Result<Arc<dyn Warehouse>> {
    let location = location.trim();
    if location.is_empty() {
        return Err(Error::missing_field("warehouse"));
    }

    if location == "memory" {
        return Ok(Arc::new(MemoryWarehouse::new()));
    }

    if let Some(path) = location.strip_prefix("duckdb://") {
        let warehouse = if path.is_empty() || path == ":memory:" {
            DuckDbWarehouse::in_memory()?
        } else {
            DuckDbWarehouse::open(path)?
        };
        return Ok(Arc::new(warehouse));
    }

    Ok(Arc::new(ObjectStoreWarehouse::parse(location)?))
}
