//! CLI module
//!
//! Command-line interface over the sync orchestrator.
//!
//! # Commands
//!
//! - `check` - Validate the access token
//! - `pipelines` - List pipelines and their normalized names
//! - `full` - Full resync into a namespace
//! - `update-deals` - Rebuild one pipeline's deals and/or deal-product table

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{exit_code, Runner};
