//! Sync orchestration
//!
//! Two entry points:
//!
//! - [`full_sync`] rebuilds every resource table plus one `deals_<pipeline>`
//!   table per pipeline
//! - [`selective_sync`] rebuilds the deals and/or deal-product table of a
//!   single pipeline
//!
//! Every write uses truncate mode. Work is strictly sequential.

mod orchestrator;
mod types;

pub use orchestrator::{full_sync, selective_sync, RESOURCE_TABLES};
pub use types::{SelectivePlan, SelectiveSync, SyncReport};

#[cfg(test)]
mod tests;
