//! Deal-product lines

use crate::error::Result;
use crate::table::{empty_batch, RowSet};
use crate::types::{JsonObject, JsonValue};
use arrow::record_batch::RecordBatch;

/// Columns of the deal-product table, in order
pub const PRODUCT_LINE_COLUMNS: [&str; 13] = [
    "deal_id",
    "product_id",
    "name",
    "description",
    "base_price",
    "created_at",
    "updated_at",
    "price",
    "amount",
    "recurrence",
    "discount",
    "discount_type",
    "total",
];

fn line(deal_id: &JsonValue, product: &JsonValue) -> JsonObject {
    let mut row = JsonObject::new();
    row.insert("deal_id".into(), deal_id.clone());
    for column in &PRODUCT_LINE_COLUMNS[1..] {
        let value = product.get(*column).cloned().unwrap_or(JsonValue::Null);
        row.insert((*column).to_string(), value);
    }
    row
}

/// One row per (deal, product) pair
///
/// Types are inferred from the JSON values. Deals without products contribute
/// nothing; no lines at all yields a zero-column batch.
pub fn product_lines(deals: &[JsonValue]) -> Result<RecordBatch> {
    let mut set = RowSet::new();

    for deal in deals {
        let Some(products) = deal.get("deal_products").and_then(JsonValue::as_array) else {
            continue;
        };
        let deal_id = deal.get("id").unwrap_or(&JsonValue::Null);
        for product in products {
            set.push(line(deal_id, product));
        }
    }

    if set.is_empty() {
        return Ok(empty_batch());
    }
    set.to_inferred_batch()
}
