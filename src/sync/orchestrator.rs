//! Full and selective sync runs

use super::types::{SelectivePlan, SelectiveSync, SyncReport};
use crate::crm::{CrmClient, DealProductSource};
use crate::error::{Error, Result};
use crate::table::is_empty_shape;
use crate::types::WriteMode;
use crate::warehouse::Warehouse;
use arrow::record_batch::RecordBatch;
use tracing::info;

/// Resource tables of a full sync, in write order
pub const RESOURCE_TABLES: [&str; 9] = [
    "pipelines",
    "custom_fields",
    "stages",
    "sources",
    "products",
    "teams",
    "users",
    "deal_lost_reasons",
    "campaigns",
];

/// Rebuild every resource table and one deals table per pipeline
///
/// Tables are written to `<namespace>.<table>` in truncate mode after all of
/// them have been fetched. Tables with no rows and no columns are skipped.
/// A failed write stops the run; tables written before it stay written.
pub async fn full_sync(
    crm: &CrmClient,
    warehouse: &dyn Warehouse,
    namespace: &str,
) -> Result<SyncReport> {
    let namespace = namespace.trim().trim_end_matches('.');
    if namespace.is_empty() {
        return Err(Error::missing_field("namespace"));
    }

    let (pipelines, pipeline_lookup) = crm.pipelines_with_lookup().await?;
    let (custom_fields, field_lookup) = crm.custom_fields_with_lookup().await?;
    let stages = crm.general_stages(&pipeline_lookup).await?;
    let sources = crm.sources().await?;
    let products = crm.products().await?;
    let teams = crm.teams().await?;
    let users = crm.users().await?;
    let lost_reasons = crm.deal_lost_reasons().await?;
    let campaigns = crm.campaigns().await?;

    let mut tables: Vec<(String, RecordBatch)> = RESOURCE_TABLES
        .iter()
        .map(|name| (*name).to_string())
        .zip([
            pipelines,
            custom_fields,
            stages,
            sources,
            products,
            teams,
            users,
            lost_reasons,
            campaigns,
        ])
        .collect();
    tables.extend(
        crm.all_pipeline_deals(&field_lookup, &pipeline_lookup)
            .await?,
    );

    let mut report = SyncReport::default();
    for (name, table) in tables {
        let destination = format!("{namespace}.{name}");
        if is_empty_shape(&table) {
            info!("Skipping {} (no data)", destination);
            report.skipped.push(destination);
            continue;
        }
        let summary = warehouse
            .write_table(&destination, &table, WriteMode::Truncate)
            .await?;
        info!("Wrote {} rows to {}", summary.rows, destination);
        report.written.push(summary);
    }

    Ok(report)
}

/// Rebuild the deals and/or deal-product tables of one pipeline
///
/// The request is validated before any network call.
pub async fn selective_sync(
    crm: &CrmClient,
    warehouse: &dyn Warehouse,
    request: &SelectiveSync,
) -> Result<SyncReport> {
    let plan = request.plan()?;
    let pipeline_id = request.pipeline_id.trim();
    let mut report = SyncReport::default();

    match plan {
        SelectivePlan::DealsAndProducts {
            deals_destination,
            products_destination,
        } => {
            let fields = crm.custom_field_lookup().await?;
            let (deals, raw) = crm.pipeline_deals_with_raw(pipeline_id, &fields).await?;
            let lines = crm
                .deals_products(DealProductSource::Prefetched(&raw))
                .await?;
            write(warehouse, &deals_destination, &deals, &mut report).await?;
            write(warehouse, &products_destination, &lines, &mut report).await?;
        }
        SelectivePlan::ProductsOnly {
            products_destination,
        } => {
            let lines = crm
                .deals_products(DealProductSource::Fetch { pipeline_id })
                .await?;
            write(warehouse, &products_destination, &lines, &mut report).await?;
        }
        SelectivePlan::DealsOnly { deals_destination } => {
            let fields = crm.custom_field_lookup().await?;
            let deals = crm.pipeline_deals(pipeline_id, &fields).await?;
            write(warehouse, &deals_destination, &deals, &mut report).await?;
        }
    }

    Ok(report)
}

async fn write(
    warehouse: &dyn Warehouse,
    destination: &str,
    table: &RecordBatch,
    report: &mut SyncReport,
) -> Result<()> {
    let summary = warehouse
        .write_table(destination, table, WriteMode::Truncate)
        .await?;
    info!("Wrote {} rows to {}", summary.rows, destination);
    report.written.push(summary);
    Ok(())
}
