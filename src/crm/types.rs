//! CRM client types

use crate::naming::normalize_name;
use crate::types::{id_text, JsonValue, OutputSelector};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;

/// Ordered mapping from a remote id to a normalized name
///
/// Ids are unique; inserting an existing id replaces its name in place.
/// Names may collide after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl LookupTable {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lookup from raw records, normalizing `name_key` values
    ///
    /// Records without a usable id are skipped. A missing name maps to an
    /// empty string.
    pub fn from_records(records: &[JsonValue], id_key: &str, name_key: &str) -> Self {
        let mut table = Self::new();
        for record in records {
            let Some(id) = record.get(id_key).and_then(id_text) else {
                continue;
            };
            let name = record
                .get(name_key)
                .and_then(JsonValue::as_str)
                .map(normalize_name)
                .unwrap_or_default();
            table.insert(id, name);
        }
        table
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos].1 = name,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, name));
            }
        }
    }

    /// Look up the name for an id
    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&pos| self.entries[pos].1.as_str())
    }

    /// Iterate `(id, name)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lookup has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LookupTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (id, name) in iter {
            table.insert(id, name);
        }
        table
    }
}

/// Result of a resource call that can produce a table, a lookup or both
#[derive(Debug, Clone)]
pub enum ResourceOutput {
    /// Table only
    Table(RecordBatch),
    /// Lookup only
    Lookup(LookupTable),
    /// Table and lookup
    Both(RecordBatch, LookupTable),
}

impl ResourceOutput {
    /// Assemble the variant a selector asks for
    pub(crate) fn select(
        selector: OutputSelector,
        table: Option<RecordBatch>,
        lookup: LookupTable,
    ) -> Self {
        match (selector, table) {
            (OutputSelector::Lookup, _) | (_, None) => Self::Lookup(lookup),
            (OutputSelector::Table, Some(table)) => Self::Table(table),
            (OutputSelector::Both, Some(table)) => Self::Both(table, lookup),
        }
    }

    /// Split into the optional table and lookup
    pub fn into_parts(self) -> (Option<RecordBatch>, Option<LookupTable>) {
        match self {
            Self::Table(t) => (Some(t), None),
            Self::Lookup(l) => (None, Some(l)),
            Self::Both(t, l) => (Some(t), Some(l)),
        }
    }

    /// Take the table, if one was produced
    pub fn into_table(self) -> Option<RecordBatch> {
        self.into_parts().0
    }

    /// Take the lookup, if one was produced
    pub fn into_lookup(self) -> Option<LookupTable> {
        self.into_parts().1
    }
}

/// Where deal-product lines come from
#[derive(Debug, Clone, Copy)]
pub enum DealProductSource<'a> {
    /// Fetch deals with products for a pipeline
    Fetch {
        /// Pipeline to list deals for
        pipeline_id: &'a str,
    },
    /// Reuse raw deals already fetched
    Prefetched(&'a [JsonValue]),
}
