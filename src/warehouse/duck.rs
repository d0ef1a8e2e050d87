//! DuckDB warehouse
//!
//! Batches are staged as a temporary Parquet file and loaded with
//! `read_parquet`, so DuckDB derives the column types from the Arrow schema.
//! The parquet extension is compiled in and extension downloads are switched
//! off, so writes never reach the network.

use super::parquet_io::write_parquet_file;
use super::types::{TableRef, WriteSummary};
use super::Warehouse;
use crate::error::{Error, Result};
use crate::table::is_empty_shape;
use crate::types::WriteMode;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use duckdb::{params, Connection};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// DuckDB-backed warehouse
pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
    location: String,
}

impl DuckDbWarehouse {
    /// Open (or create) a database file
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .and_then(|conn| configure(&conn).map(|()| conn))
            .map_err(|e| Error::warehouse(path, format!("failed to open database: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: path.to_string(),
        })
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .and_then(|conn| configure(&conn).map(|()| conn))
            .map_err(|e| Error::warehouse(":memory:", format!("failed to open database: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: ":memory:".to_string(),
        })
    }

    /// Row count of a destination table, `None` when it does not exist
    pub fn row_count(&self, destination: &str) -> Result<Option<i64>> {
        let table = TableRef::parse(destination)?;
        let conn = lock(&self.conn, destination)?;
        if !table_exists(&conn, &table).map_err(duck_error(destination))? {
            return Ok(None);
        }
        let sql = format!("SELECT count(*) FROM {}", qualified(&table));
        let count = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(duck_error(destination))?;
        Ok(Some(count))
    }

    /// Column names of a destination table in table order
    pub fn column_names(&self, destination: &str) -> Result<Vec<String>> {
        let table = TableRef::parse(destination)?;
        let conn = lock(&self.conn, destination)?;
        let mut stmt = conn
            .prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
            )
            .map_err(duck_error(destination))?;
        let names = stmt
            .query_map(params![table.namespace, table.table], |row| row.get(0))
            .map_err(duck_error(destination))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(duck_error(destination))?;
        Ok(names)
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn write_table(
        &self,
        destination: &str,
        batch: &RecordBatch,
        mode: WriteMode,
    ) -> Result<WriteSummary> {
        let table = TableRef::parse(destination)?;
        let conn = Arc::clone(&self.conn);
        let batch = batch.clone();
        let dest = destination.to_string();

        tokio::task::spawn_blocking(move || write_blocking(&conn, &dest, &table, &batch, mode))
            .await
            .map_err(|e| Error::warehouse(destination, format!("write task failed: {e}")))?
    }

    fn describe(&self) -> String {
        format!("duckdb://{}", self.location)
    }
}

/// Disable extension autoinstall and autoload on a fresh connection
pub(super) fn configure(conn: &Connection) -> duckdb::Result<()> {
    conn.execute_batch(
        "SET autoinstall_known_extensions = false;\n\
         SET autoload_known_extensions = false;",
    )
}

fn write_blocking(
    conn: &Mutex<Connection>,
    destination: &str,
    table: &TableRef,
    batch: &RecordBatch,
    mode: WriteMode,
) -> Result<WriteSummary> {
    let conn = lock(conn, destination)?;
    let target = qualified(table);

    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {};",
        quote_ident(&table.namespace)
    ))
    .map_err(duck_error(destination))?;

    if is_empty_shape(batch) {
        if mode == WriteMode::Truncate
            && table_exists(&conn, table).map_err(duck_error(destination))?
        {
            conn.execute_batch(&format!("DELETE FROM {target};"))
                .map_err(duck_error(destination))?;
        }
        return Ok(WriteSummary::new(destination, mode, 0, 0));
    }

    let staged = StagedFile::write(batch)?;
    let source = format!("read_parquet({})", quote_literal(&staged.path.to_string_lossy()));

    let sql = match mode {
        WriteMode::Truncate => {
            format!("CREATE OR REPLACE TABLE {target} AS SELECT * FROM {source};")
        }
        WriteMode::Append => format!(
            "CREATE TABLE IF NOT EXISTS {target} AS SELECT * FROM {source} LIMIT 0;\n\
             INSERT INTO {target} BY NAME SELECT * FROM {source};"
        ),
    };
    debug!("Loading {} rows into {} ({})", batch.num_rows(), target, mode);
    conn.execute_batch(&sql).map_err(duck_error(destination))?;

    Ok(WriteSummary::new(
        destination,
        mode,
        batch.num_rows(),
        batch.num_columns(),
    ))
}

/// Temporary Parquet file removed on drop
struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    fn write(batch: &RecordBatch) -> Result<Self> {
        let n = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "rdcrm-sync-{}-{n}.parquet",
            std::process::id()
        ));
        write_parquet_file(&path, batch)?;
        Ok(Self { path })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock<'a>(
    conn: &'a Mutex<Connection>,
    destination: &str,
) -> Result<std::sync::MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|_| Error::warehouse(destination, "connection lock poisoned"))
}

fn table_exists(conn: &Connection, table: &TableRef) -> duckdb::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
        params![table.namespace, table.table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn duck_error(destination: &str) -> impl Fn(duckdb::Error) -> Error + '_ {
    move |e| Error::warehouse(destination, e.to_string())
}

fn qualified(table: &TableRef) -> String {
    format!(
        "{}.{}",
        quote_ident(&table.namespace),
        quote_ident(&table.table)
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
