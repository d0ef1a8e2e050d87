//! Deal normalization
//!
//! Turns raw deal records into one flat row per deal and one row per
//! (deal, product) pair.
//!
//! # Deal rows
//!
//! Every deal row carries the [`CORE_COLUMNS`] first, then one column per
//! custom field named by the resolved custom-field label. Custom columns that
//! are null for every deal of a pipeline are dropped when the table is built.

mod flatten;
mod products;

pub use flatten::{assemble_deals_table, flatten_deal, DealRow, CORE_COLUMNS};
pub use products::{product_lines, PRODUCT_LINE_COLUMNS};
