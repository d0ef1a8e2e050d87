//! Runtime settings
//!
//! Settings come from an optional YAML file and are then overridden by
//! environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `RD_CRM_TOKEN` | `crm.token` |
//! | `RDCRM_BASE_URL` | `crm.base_url` |
//! | `RDCRM_WAREHOUSE` | `warehouse` |
//! | `RDCRM_NAMESPACE` | `namespace` |

use crate::crm::{CrmClient, DEFAULT_BASE_URL};
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::OptionStringExt;
use crate::warehouse::{self, Warehouse};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the access token
pub const TOKEN_ENV: &str = "RD_CRM_TOKEN";
/// Environment variable overriding the API root
pub const BASE_URL_ENV: &str = "RDCRM_BASE_URL";
/// Environment variable overriding the warehouse location
pub const WAREHOUSE_ENV: &str = "RDCRM_WAREHOUSE";
/// Environment variable overriding the destination namespace
pub const NAMESPACE_ENV: &str = "RDCRM_NAMESPACE";

// ============================================================================
// Settings
// ============================================================================

/// Complete runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// CRM API access
    #[serde(default)]
    pub crm: CrmSettings,

    /// Warehouse location (`memory`, `duckdb:///file`, `s3://bucket/prefix`, local dir)
    #[serde(default = "default_warehouse")]
    pub warehouse: String,

    /// Namespace full-sync tables are written under (e.g. `project.dataset`)
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crm: CrmSettings::default(),
            warehouse: default_warehouse(),
            namespace: default_namespace(),
        }
    }
}

fn default_warehouse() -> String {
    "duckdb://rd_crm.duckdb".to_string()
}

fn default_namespace() -> String {
    "rd_crm".to_string()
}

/// CRM API access settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrmSettings {
    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Access token
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sustained request rate
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Requests allowed in a burst
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

impl std::fmt::Debug for CrmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmSettings")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_second", &self.requests_per_second)
            .field("burst_size", &self.burst_size)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_rps() -> u32 {
    2
}

fn default_burst() -> u32 {
    5
}

impl Settings {
    /// Parse settings from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a YAML settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Load from an optional file, apply the process environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from a variable lookup; blank values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).none_if_blank();

        if let Some(token) = get(TOKEN_ENV) {
            self.crm.token = Some(token);
        }
        if let Some(url) = get(BASE_URL_ENV) {
            self.crm.base_url = url;
        }
        if let Some(location) = get(WAREHOUSE_ENV) {
            self.warehouse = location;
        }
        if let Some(namespace) = get(NAMESPACE_ENV) {
            self.namespace = namespace;
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.crm.timeout_secs == 0 {
            return Err(Error::invalid_value("crm.timeout_secs", "must be greater than 0"));
        }
        if self.crm.requests_per_second == 0 {
            return Err(Error::invalid_value(
                "crm.requests_per_second",
                "must be greater than 0",
            ));
        }
        url::Url::parse(&self.crm.base_url)
            .map_err(|e| Error::invalid_value("crm.base_url", e.to_string()))?;
        if self.warehouse.trim().is_empty() {
            return Err(Error::missing_field("warehouse"));
        }
        Ok(())
    }

    /// HTTP client configuration derived from the CRM settings
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .base_url(self.crm.base_url.as_str())
            .timeout(Duration::from_secs(self.crm.timeout_secs))
            .rate_limit(RateLimiterConfig::new(
                self.crm.requests_per_second,
                self.crm.burst_size,
            ))
            .build()
    }

    /// Validate the token and build a CRM client
    pub async fn connect_crm(&self) -> Result<CrmClient> {
        CrmClient::connect(self.crm.token.as_deref(), self.http_config()).await
    }

    /// Open the configured warehouse
    pub fn open_warehouse(&self) -> Result<Arc<dyn Warehouse>> {
        warehouse::open(&self.warehouse)
    }
}
