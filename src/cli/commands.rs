//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RD Station CRM to warehouse sync
#[derive(Parser, Debug)]
#[command(name = "rdcrm-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// CRM access token
    #[arg(long, global = true, env = "RD_CRM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Warehouse location (memory, duckdb:///file, s3://bucket/prefix, local dir)
    #[arg(short, long, global = true, env = "RDCRM_WAREHOUSE")]
    pub warehouse: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the access token
    Check,

    /// List pipelines and their normalized names
    Pipelines {
        /// What to produce: both, table (df) or lookup (dict)
        #[arg(long, default_value = "lookup")]
        output: String,
    },

    /// Rebuild every resource table and one deals table per pipeline
    Full {
        /// Destination namespace, e.g. `project.dataset`
        #[arg(short, long, env = "RDCRM_NAMESPACE")]
        namespace: Option<String>,
    },

    /// Rebuild the deals and/or deal-product table of one pipeline
    UpdateDeals {
        /// Pipeline id
        #[arg(long)]
        pipeline_id: String,

        /// Deals table destination, e.g. `project.dataset.deals_sales`
        #[arg(long)]
        deals_destination: Option<String>,

        /// Deal-product table destination
        #[arg(long)]
        products_destination: Option<String>,

        /// Skip the deals table
        #[arg(long)]
        no_deals: bool,

        /// Also rebuild the deal-product table
        #[arg(long)]
        products: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
