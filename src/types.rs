//! Common types used throughout rdcrm-sync
//!
//! Type aliases and the small closed enums that are validated at the
//! boundary before any request or write is issued.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type (insertion ordered)
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Write Mode
// ============================================================================

/// How a table is written to its warehouse destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the destination contents entirely
    #[default]
    Truncate,
    /// Add rows, preserving existing contents
    Append,
}

impl WriteMode {
    /// Wire/CLI name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Truncate => "truncate",
            WriteMode::Append => "append",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "truncate" => Ok(WriteMode::Truncate),
            "append" => Ok(WriteMode::Append),
            other => Err(Error::invalid_value(
                "write_mode",
                format!("'{other}' is not one of: truncate, append"),
            )),
        }
    }
}

// ============================================================================
// Output Selector
// ============================================================================

/// Which shape a lookup-producing resource call should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSelector {
    /// Table and lookup
    #[default]
    Both,
    /// Table only
    #[serde(alias = "df")]
    Table,
    /// Lookup only
    #[serde(alias = "dict")]
    Lookup,
}

impl OutputSelector {
    /// Whether the Arrow table must be built
    pub fn wants_table(&self) -> bool {
        matches!(self, OutputSelector::Both | OutputSelector::Table)
    }

    /// Whether the id → name lookup must be built
    pub fn wants_lookup(&self) -> bool {
        matches!(self, OutputSelector::Both | OutputSelector::Lookup)
    }
}

impl FromStr for OutputSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "both" => Ok(OutputSelector::Both),
            "table" | "df" => Ok(OutputSelector::Table),
            "lookup" | "dict" => Ok(OutputSelector::Lookup),
            other => Err(Error::invalid_value(
                "output",
                format!("'{other}' is not one of: both, table, lookup"),
            )),
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle blank strings
pub trait OptionStringExt {
    /// Returns None if the string is empty or whitespace only
    fn none_if_blank(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_blank(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_blank(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Render a JSON identifier (string or number) as lookup/destination text
pub fn id_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
