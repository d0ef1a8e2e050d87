//! Warehouse types

use crate::error::{Error, Result};
use crate::types::WriteMode;
use std::fmt;

/// Namespace and table parsed from a dotted destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Schema / dataset / directory
    pub namespace: String,
    /// Table name
    pub table: String,
}

impl TableRef {
    /// Parse `a.b.c` style destinations, keeping the last two segments
    pub fn parse(destination: &str) -> Result<Self> {
        let segments: Vec<&str> = destination.trim().split('.').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::invalid_value(
                "destination",
                format!("'{destination}' must look like namespace.table"),
            ));
        }

        let n = segments.len();
        Ok(Self {
            namespace: segments[n - 2].trim().to_string(),
            table: segments[n - 1].trim().to_string(),
        })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.table)
    }
}

/// Outcome of one confirmed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Destination as requested
    pub destination: String,
    /// Mode used
    pub mode: WriteMode,
    /// Rows written
    pub rows: usize,
    /// Columns in the written table
    pub columns: usize,
}

impl WriteSummary {
    pub(crate) fn new(destination: &str, mode: WriteMode, rows: usize, columns: usize) -> Self {
        Self {
            destination: destination.to_string(),
            mode,
            rows,
            columns,
        }
    }
}
