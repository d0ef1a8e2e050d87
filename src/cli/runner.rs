//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::sync::{full_sync, selective_sync, SelectiveSync, SyncReport};
use crate::types::{OptionStringExt, OutputSelector};
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Pipelines { output } => self.pipelines(output).await,
            Commands::Full { namespace } => self.full(namespace.as_deref()).await,
            Commands::UpdateDeals {
                pipeline_id,
                deals_destination,
                products_destination,
                no_deals,
                products,
            } => {
                let request = SelectiveSync {
                    pipeline_id: pipeline_id.clone(),
                    deals_destination: deals_destination.clone(),
                    products_destination: products_destination.clone(),
                    deals: !*no_deals,
                    products: *products,
                };
                self.update_deals(&request).await
            }
        }
    }

    /// Settings file plus environment, with command-line flags on top
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.cli.config.as_deref())?;
        if let Some(token) = self.cli.token.clone().none_if_blank() {
            settings.crm.token = Some(token);
        }
        if let Some(warehouse) = self.cli.warehouse.clone().none_if_blank() {
            settings.warehouse = warehouse;
        }
        Ok(settings)
    }

    async fn check(&self) -> Result<()> {
        let settings = self.settings()?;
        settings.connect_crm().await?;
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {"status": "SUCCEEDED"}
        }));
        Ok(())
    }

    async fn pipelines(&self, output: &str) -> Result<()> {
        let selector: OutputSelector = output.parse()?;
        let settings = self.settings()?;
        let crm = settings.connect_crm().await?;

        let (table, lookup) = crm.pipelines(selector).await?.into_parts();
        if let Some(lookup) = lookup {
            for (id, name) in lookup.iter() {
                self.output_message(&json!({"type": "PIPELINE", "id": id, "name": name}));
            }
        }
        if let Some(table) = table {
            self.output_message(&json!({
                "type": "TABLE",
                "name": "pipelines",
                "rows": table.num_rows(),
                "columns": table
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect::<Vec<_>>(),
            }));
        }
        Ok(())
    }

    async fn full(&self, namespace: Option<&str>) -> Result<()> {
        let mut settings = self.settings()?;
        if let Some(namespace) = namespace.map(str::to_string).none_if_blank() {
            settings.namespace = namespace;
        }

        let crm = settings.connect_crm().await?;
        let warehouse = settings.open_warehouse()?;
        info!(
            "Full sync into {} under {}",
            warehouse.describe(),
            settings.namespace
        );

        let report = full_sync(&crm, warehouse.as_ref(), &settings.namespace).await?;
        self.output_report(&report);
        Ok(())
    }

    async fn update_deals(&self, request: &SelectiveSync) -> Result<()> {
        // Reject bad requests before touching the network
        request.plan()?;

        let settings = self.settings()?;
        let crm = settings.connect_crm().await?;
        let warehouse = settings.open_warehouse()?;
        info!(
            "Updating pipeline {} into {}",
            request.pipeline_id,
            warehouse.describe()
        );

        let report = selective_sync(&crm, warehouse.as_ref(), request).await?;
        self.output_report(&report);
        Ok(())
    }

    fn output_report(&self, report: &SyncReport) {
        for summary in &report.written {
            self.output_message(&json!({
                "type": "WRITE",
                "destination": summary.destination,
                "mode": summary.mode.as_str(),
                "rows": summary.rows,
                "columns": summary.columns,
            }));
        }
        for destination in &report.skipped {
            self.output_message(&json!({"type": "SKIP", "destination": destination}));
        }
        self.output_message(&json!({
            "type": "SUMMARY",
            "tables_written": report.written.len(),
            "tables_skipped": report.skipped.len(),
            "rows": report.total_rows(),
        }));
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("command", &self.cli.command)
            .finish_non_exhaustive()
    }
}

/// Map an error to a process exit code
pub fn exit_code(error: &Error) -> i32 {
    if error.is_configuration() {
        2
    } else {
        1
    }
}
