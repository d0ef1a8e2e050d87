//! Parquet files on object storage (S3, R2, GCS, Azure) or a local directory
//!
//! Each table is a directory `<namespace>/<table>/` of Parquet parts.

use super::parquet_io::encode_parquet;
use super::types::{TableRef, WriteSummary};
use super::Warehouse;
use crate::error::{Error, Result};
use crate::table::is_empty_shape;
use crate::types::WriteMode;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Part file written by truncating loads
pub const TRUNCATE_PART: &str = "part-00000.parquet";

/// Object-store-backed warehouse
#[derive(Debug, Clone)]
pub struct ObjectStoreWarehouse {
    store: Arc<dyn ObjectStore>,
    /// Key prefix within the bucket/container
    prefix: String,
    /// URL scheme for logging
    scheme: String,
}

/// Split `bucket/some/prefix` into bucket and prefix
fn split_bucket(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(idx) => (
            &rest[..idx],
            rest[idx + 1..].trim_end_matches('/').to_string(),
        ),
        None => (rest, String::new()),
    }
}

impl ObjectStoreWarehouse {
    /// Parse a location URL and build the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path` - AWS S3
    /// - `r2://bucket/path` - Cloudflare R2 (S3-compatible, `R2_ENDPOINT_URL`)
    /// - `gs://bucket/path` - Google Cloud Storage
    /// - `az://container/path` - Azure Blob Storage
    /// - `/local/path`, `./path` or `file:///path` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::s3(rest, "s3")
        } else if let Some(rest) = url.strip_prefix("r2://") {
            Self::s3(rest, "r2")
        } else if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self::with_store(Arc::new(store), prefix, "gs"))
        } else if let Some(rest) = url.strip_prefix("az://") {
            let (container, prefix) = split_bucket(rest);
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self::with_store(Arc::new(store), prefix, "az"))
        } else {
            Self::local(url.strip_prefix("file://").unwrap_or(url))
        }
    }

    fn s3(rest: &str, scheme: &str) -> Result<Self> {
        let (bucket, prefix) = split_bucket(rest);
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if scheme == "r2" {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }
        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;
        Ok(Self::with_store(Arc::new(store), prefix, scheme))
    }

    /// Local directory, created when missing
    pub fn local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
        Ok(Self::with_store(Arc::new(store), String::new(), "file"))
    }

    /// Wrap an existing store
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            scheme: scheme.into(),
        }
    }

    /// Directory holding a table's parts
    pub fn table_dir(&self, table: &TableRef) -> ObjectPath {
        let dir = format!("{}/{}", table.namespace, table.table);
        if self.prefix.is_empty() {
            ObjectPath::from(dir)
        } else {
            ObjectPath::from(format!("{}/{dir}", self.prefix))
        }
    }

    /// Objects currently stored for a table, sorted by key
    pub async fn list_parts(&self, table: &TableRef) -> Result<Vec<ObjectPath>> {
        let dir = self.table_dir(table);
        let mut parts: Vec<ObjectPath> = self
            .store
            .list(Some(&dir))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await
            .map_err(|e| Error::warehouse(table.to_string(), format!("listing failed: {e}")))?;
        parts.sort();
        Ok(parts)
    }

    async fn clear(&self, table: &TableRef) -> Result<()> {
        for part in self.list_parts(table).await? {
            self.store
                .delete(&part)
                .await
                .map_err(|e| Error::warehouse(table.to_string(), format!("delete {part}: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Warehouse for ObjectStoreWarehouse {
    async fn write_table(
        &self,
        destination: &str,
        batch: &RecordBatch,
        mode: WriteMode,
    ) -> Result<WriteSummary> {
        let table = TableRef::parse(destination)?;

        if mode == WriteMode::Truncate {
            self.clear(&table).await?;
        }
        if is_empty_shape(batch) {
            return Ok(WriteSummary::new(destination, mode, 0, 0));
        }

        let filename = match mode {
            WriteMode::Truncate => TRUNCATE_PART.to_string(),
            WriteMode::Append => format!("part-{}.parquet", Utc::now().format("%Y%m%dT%H%M%S%6f")),
        };
        let path = self.table_dir(&table).child(filename);
        let data = encode_parquet(batch)?;

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::warehouse(destination, format!("write {path}: {e}")))?;
        debug!("Wrote {}://{}", self.scheme, path);

        Ok(WriteSummary::new(
            destination,
            mode,
            batch.num_rows(),
            batch.num_columns(),
        ))
    }

    fn describe(&self) -> String {
        if self.prefix.is_empty() {
            format!("{}://", self.scheme)
        } else {
            format!("{}://{}", self.scheme, self.prefix)
        }
    }
}
