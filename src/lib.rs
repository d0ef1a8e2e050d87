// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # rdcrm-sync
//!
//! Extracts resources from the RD Station CRM REST API, flattens them into
//! Arrow tables and loads them into a warehouse.
//!
//! ## Features
//!
//! - **Token-checked client**: one `/token/check` round trip before any data call
//! - **`has_more` pagination**: strict for reference data, lenient for deals
//! - **Deal flattening**: nested organization/contact/product/custom-field data
//!   becomes one typed row per deal
//! - **Warehouses**: DuckDB, object stores (S3, R2, GCS, Azure, local) and memory
//! - **Full and selective sync**: rebuild everything, or one pipeline's tables
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rdcrm_sync::config::Settings;
//! use rdcrm_sync::sync::{full_sync, selective_sync, SelectiveSync};
//!
//! #[tokio::main]
//! async fn main() -> rdcrm_sync::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let crm = settings.connect_crm().await?;
//!     let warehouse = settings.open_warehouse()?;
//!
//!     full_sync(&crm, warehouse.as_ref(), "analytics.rd_crm").await?;
//!
//!     let request = SelectiveSync::new("5f1a...")
//!         .deals_to("analytics.rd_crm.deals_sales")
//!         .with_products(true)
//!         .products_to("analytics.rd_crm.deal_products_sales");
//!     selective_sync(&crm, warehouse.as_ref(), &request).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        sync (full / selective)               │
//! └──────────────────────────────────────────────────────────────┘
//!          │                      │                      │
//! ┌────────┴───────┐    ┌─────────┴────────┐    ┌────────┴───────┐
//! │      crm       │    │      deals       │    │   warehouse    │
//! │ token check    │    │ flatten deals    │    │ DuckDB         │
//! │ resources      │    │ product lines    │    │ object store   │
//! └────────────────┘    └──────────────────┘    │ memory         │
//!          │                      │             └────────────────┘
//! ┌────────┴───────┬──────────────┴───┬──────────────┐
//! │ http           │ pagination       │ table        │
//! │ rate limit     │ has_more pages   │ rows → Arrow │
//! └────────────────┴──────────────────┴──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Column/table name normalization
pub mod naming;

/// HTTP client with rate limiting
pub mod http;

/// `has_more` page-number pagination
pub mod pagination;

/// JSON records to Arrow tables
pub mod table;

/// RD Station CRM resource client
pub mod crm;

/// Deal flattening and deal-product lines
pub mod deals;

/// Warehouse destinations
pub mod warehouse;

/// Full and selective sync orchestration
pub mod sync;

/// Runtime settings
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
