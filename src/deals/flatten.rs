//! Deal flattening

use crate::crm::LookupTable;
use crate::error::{Error, Result};
use crate::table::{empty_batch, CoercionPolicy, RowSet};
use crate::types::{id_text, JsonObject, JsonValue};
use arrow::record_batch::RecordBatch;

/// One flattened deal
pub type DealRow = JsonObject;

/// Fixed leading columns of every deals table
///
/// `amount_montly` is the provider's own field spelling.
pub const CORE_COLUMNS: [&str; 19] = [
    "id",
    "name",
    "organization",
    "win",
    "stage",
    "user",
    "created_at",
    "updated_at",
    "closed_at",
    "amount_montly",
    "amount_unique",
    "amount_total",
    "source",
    "campaign",
    "lost_reason",
    "products",
    "contact_name",
    "phone",
    "email",
];

/// `deal[key].name`, or null when the object or the name is missing
fn nested_name(deal: &JsonValue, key: &str) -> JsonValue {
    deal.get(key)
        .and_then(|v| v.get("name"))
        .cloned()
        .unwrap_or(JsonValue::Null)
}

fn field(deal: &JsonValue, key: &str) -> JsonValue {
    deal.get(key).cloned().unwrap_or(JsonValue::Null)
}

/// First element of an array field
fn first<'a>(value: Option<&'a JsonValue>, key: &str) -> Option<&'a JsonValue> {
    value?.get(key)?.as_array()?.first()
}

fn product_names(deal: &JsonValue) -> String {
    deal.get("deal_products")
        .and_then(JsonValue::as_array)
        .map(|products| {
            products
                .iter()
                .filter_map(|p| p.get("name").and_then(JsonValue::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Flatten one raw deal
///
/// Custom field values are keyed by the label `custom_fields` resolves their
/// id to. They are inserted after the core columns, so a label equal to a core
/// column name overwrites it.
pub fn flatten_deal(deal: &JsonValue, custom_fields: &LookupTable) -> Result<DealRow> {
    let contact = first(Some(deal), "contacts");
    let contact_name = contact
        .and_then(|c| c.get("name"))
        .cloned()
        .unwrap_or(JsonValue::Null);
    let phone = first(contact, "phones")
        .and_then(|p| p.get("phone"))
        .cloned()
        .unwrap_or(JsonValue::Null);
    let email = first(contact, "emails")
        .and_then(|e| e.get("email"))
        .cloned()
        .unwrap_or(JsonValue::Null);

    let mut row = DealRow::new();
    row.insert("id".into(), field(deal, "id"));
    row.insert("name".into(), field(deal, "name"));
    row.insert("organization".into(), nested_name(deal, "organization"));
    row.insert("win".into(), field(deal, "win"));
    row.insert("stage".into(), nested_name(deal, "deal_stage"));
    row.insert("user".into(), nested_name(deal, "user"));
    row.insert("created_at".into(), field(deal, "created_at"));
    row.insert("updated_at".into(), field(deal, "updated_at"));
    row.insert("closed_at".into(), field(deal, "closed_at"));
    row.insert("amount_montly".into(), field(deal, "amount_montly"));
    row.insert("amount_unique".into(), field(deal, "amount_unique"));
    row.insert("amount_total".into(), field(deal, "amount_total"));
    row.insert("source".into(), nested_name(deal, "deal_source"));
    row.insert("campaign".into(), nested_name(deal, "campaign"));
    row.insert("lost_reason".into(), nested_name(deal, "deal_lost_reason"));
    row.insert("products".into(), JsonValue::String(product_names(deal)));
    row.insert("contact_name".into(), contact_name);
    row.insert("phone".into(), phone);
    row.insert("email".into(), email);

    let entries = deal
        .get("deal_custom_fields")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for entry in entries {
        let field_id = entry
            .get("custom_field_id")
            .and_then(id_text)
            .unwrap_or_default();
        let label = custom_fields
            .get(&field_id)
            .ok_or_else(|| Error::UnresolvedCustomField {
                field_id: field_id.clone(),
            })?;
        row.insert(label.to_string(), field(entry, "value"));
    }

    Ok(row)
}

/// Build one pipeline's deals table from flattened rows
pub fn assemble_deals_table(rows: Vec<DealRow>) -> Result<RecordBatch> {
    if rows.is_empty() {
        return Ok(empty_batch());
    }

    let mut set = RowSet::from_rows(rows);
    set.retain_columns(|s, name| CORE_COLUMNS.contains(&name) || !s.column_is_all_null(name));
    set.to_record_batch(CoercionPolicy::Deal)
}
