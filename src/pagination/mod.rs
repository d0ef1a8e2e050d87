//! Pagination module
//!
//! The CRM paginates list endpoints by page number and signals further pages
//! with a boolean `has_more` flag next to the records array.
//!
//! # Overview
//!
//! Every fetched page is classified into a [`PageOutcome`] and folded into a
//! [`PageStep`]. Under [`MalformedPolicy::Strict`] a malformed page is an
//! error; under [`MalformedPolicy::Lenient`] a malformed page after the first
//! ends pagination with whatever was accumulated.

mod paginator;
mod types;

pub use paginator::{HasMorePaginator, DEFAULT_PAGE_LIMIT};
pub use types::{MalformedPolicy, PageOutcome, PageStep, PaginationState};

#[cfg(test)]
mod tests;
