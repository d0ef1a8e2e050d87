//! CRM API access
//!
//! [`CrmClient`] validates the access token once on construction and then
//! exposes one method per resource. Each list resource is turned into an
//! Arrow table using the shared resource coercion policy; pipelines and
//! custom fields also yield a [`LookupTable`] used to name deal tables and
//! deal columns.

mod client;
mod types;

pub use client::{CrmClient, DEFAULT_BASE_URL, GENERAL_STAGE_COLUMNS, STAGE_PAGE_LIMIT};
pub use types::{DealProductSource, LookupTable, ResourceOutput};
