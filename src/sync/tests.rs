//! Tests for sync orchestration

use super::*;
use crate::crm::CrmClient;
use crate::error::Error;
use crate::http::HttpClientConfig;
use crate::types::WriteMode;
use crate::warehouse::{MemoryWarehouse, Warehouse, WriteSummary};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connected(server: &MockServer) -> CrmClient {
    Mock::given(method("GET"))
        .and(path("/token/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    CrmClient::connect(Some("tok"), config).await.unwrap()
}

async fn mount(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn deal_with_product() -> Value {
    json!({
        "id": "d1",
        "name": "Contrato",
        "win": true,
        "amount_total": 300,
        "deal_products": [
            {"product_id": "x", "name": "Plano", "price": 300, "amount": 1, "total": 300}
        ],
        "contacts": [],
        "deal_custom_fields": [{"custom_field_id": "cf1", "value": "Varejo"}]
    })
}

// ============================================================================
// Request Validation
// ============================================================================

#[test]
fn test_plan_both() {
    let plan = SelectiveSync::new("p1")
        .deals_to("proj.crm.deals")
        .products_to("proj.crm.deal_products")
        .with_products(true)
        .plan()
        .unwrap();
    assert_eq!(
        plan,
        SelectivePlan::DealsAndProducts {
            deals_destination: "proj.crm.deals".to_string(),
            products_destination: "proj.crm.deal_products".to_string(),
        }
    );
}

#[test]
fn test_plan_products_only_ignores_deals_destination() {
    let plan = SelectiveSync::new("p1")
        .deals_to("proj.crm.deals")
        .products_to("proj.crm.deal_products")
        .with_deals(false)
        .with_products(true)
        .plan()
        .unwrap();
    assert!(matches!(plan, SelectivePlan::ProductsOnly { .. }));
}

#[test_case(true, None, false, None ; "deals without destination")]
#[test_case(true, Some("  "), false, None ; "deals with blank destination")]
#[test_case(false, None, true, None ; "products without destination")]
#[test_case(true, Some("a.b"), true, None ; "both without products destination")]
#[test_case(false, Some("a.b"), false, Some("a.c") ; "neither switch")]
fn test_plan_rejects(
    deals: bool,
    deals_dest: Option<&str>,
    products: bool,
    products_dest: Option<&str>,
) {
    let request = SelectiveSync {
        pipeline_id: "p1".to_string(),
        deals_destination: deals_dest.map(str::to_string),
        products_destination: products_dest.map(str::to_string),
        deals,
        products,
    };
    assert!(request.plan().unwrap_err().is_configuration());
}

#[test]
fn test_plan_requires_pipeline() {
    let err = SelectiveSync::new(" ").deals_to("a.b").plan().unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

#[tokio::test]
async fn test_invalid_request_makes_no_data_calls() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;
    Mock::given(method("GET"))
        .and(path_regex("^/(deals|custom_fields)"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let warehouse = MemoryWarehouse::new();
    let neither = SelectiveSync::new("p1").with_deals(false);
    let err = selective_sync(&crm, &warehouse, &neither).await.unwrap_err();
    assert!(err.is_configuration());

    let no_destination = SelectiveSync::new("p1");
    let err = selective_sync(&crm, &warehouse, &no_destination)
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(warehouse.writes().is_empty());
}

// ============================================================================
// Selective Sync
// ============================================================================

#[tokio::test]
async fn test_deals_and_products_share_one_fetch() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;
    mount(&server, "/custom_fields", json!([{"id": "cf1", "label": "Segmento"}])).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("deal_pipeline_id", "p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"deals": [deal_with_product()], "has_more": false})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let warehouse = MemoryWarehouse::new();
    let request = SelectiveSync::new("p1")
        .deals_to("proj.crm.deals_vendas")
        .products_to("proj.crm.deal_products")
        .with_products(true);
    let report = selective_sync(&crm, &warehouse, &request).await.unwrap();

    assert_eq!(
        report.written_destinations(),
        vec!["proj.crm.deals_vendas", "proj.crm.deal_products"]
    );
    assert!(report.written.iter().all(|w| w.mode == WriteMode::Truncate));
    assert_eq!(warehouse.row_count("crm.deals_vendas"), 1);
    assert_eq!(warehouse.row_count("crm.deal_products"), 1);

    let deals = warehouse.table("crm.deals_vendas").unwrap();
    assert!(deals[0].column_by_name("segmento").is_some());
}

#[tokio::test]
async fn test_products_only_uses_product_filter() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("product_presence", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"deals": [deal_with_product()], "has_more": false})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/custom_fields"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let warehouse = MemoryWarehouse::new();
    let request = SelectiveSync::new("p1")
        .with_deals(false)
        .with_products(true)
        .products_to("crm.deal_products");
    let report = selective_sync(&crm, &warehouse, &request).await.unwrap();
    assert_eq!(report.written_destinations(), vec!["crm.deal_products"]);
    assert_eq!(report.total_rows(), 1);
}

#[tokio::test]
async fn test_deals_only_writes_deals_table() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;
    mount(&server, "/custom_fields", json!([{"id": "cf1", "label": "Segmento"}])).await;
    mount(
        &server,
        "/deals",
        json!({"deals": [deal_with_product()], "has_more": false}),
    )
    .await;

    let warehouse = MemoryWarehouse::new();
    let request = SelectiveSync::new("p1").deals_to("crm.deals_vendas");
    let report = selective_sync(&crm, &warehouse, &request).await.unwrap();
    assert_eq!(report.written_destinations(), vec!["crm.deals_vendas"]);
}

// ============================================================================
// Full Sync
// ============================================================================

#[tokio::test]
async fn test_full_sync_skips_empty_tables() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;

    mount(&server, "/deal_pipelines", json!([])).await;
    mount(&server, "/custom_fields", json!([{"id": "cf1", "label": "Segmento"}])).await;
    mount(
        &server,
        "/deal_sources",
        json!({"deal_sources": [{"id": "s1", "name": "Site"}], "has_more": false}),
    )
    .await;
    mount(&server, "/products", json!({"products": []})).await;
    mount(&server, "/teams", json!({"teams": []})).await;
    mount(&server, "/users", json!({"users": [{"id": "u1", "name": "Ana", "active": true}]})).await;
    mount(
        &server,
        "/deal_lost_reasons",
        json!({"deal_lost_reasons": [], "has_more": false}),
    )
    .await;
    mount(&server, "/campaigns", json!({"campaigns": [], "has_more": false})).await;

    let warehouse = MemoryWarehouse::new();
    let report = full_sync(&crm, &warehouse, "proj.crm").await.unwrap();

    assert_eq!(
        report.written_destinations(),
        vec!["proj.crm.custom_fields", "proj.crm.sources", "proj.crm.users"]
    );
    assert_eq!(
        report.skipped,
        vec![
            "proj.crm.pipelines",
            "proj.crm.stages",
            "proj.crm.products",
            "proj.crm.teams",
            "proj.crm.deal_lost_reasons",
            "proj.crm.campaigns",
        ]
    );
    assert_eq!(warehouse.writes().len(), 3);
}

#[tokio::test]
async fn test_full_sync_requires_namespace() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;
    let err = full_sync(&crm, &MemoryWarehouse::new(), " ")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

/// Delegates to a memory warehouse but rejects one table
struct RejectingWarehouse {
    inner: MemoryWarehouse,
    rejected_table: &'static str,
}

#[async_trait]
impl Warehouse for RejectingWarehouse {
    async fn write_table(
        &self,
        destination: &str,
        batch: &RecordBatch,
        mode: WriteMode,
    ) -> crate::error::Result<WriteSummary> {
        if destination.ends_with(&format!(".{}", self.rejected_table)) {
            return Err(Error::warehouse(destination, "quota exceeded"));
        }
        self.inner.write_table(destination, batch, mode).await
    }

    fn describe(&self) -> String {
        "rejecting".to_string()
    }
}

#[tokio::test]
async fn test_full_sync_stops_at_failed_write_and_keeps_earlier_tables() {
    let server = MockServer::start().await;
    let crm = connected(&server).await;

    mount(&server, "/deal_pipelines", json!([])).await;
    mount(&server, "/custom_fields", json!([{"id": "cf1", "label": "Segmento"}])).await;
    mount(
        &server,
        "/deal_sources",
        json!({"deal_sources": [{"id": "s1", "name": "Site"}], "has_more": false}),
    )
    .await;
    mount(&server, "/products", json!({"products": [{"id": "pr1", "name": "Plano"}]})).await;
    mount(&server, "/teams", json!({"teams": []})).await;
    mount(&server, "/users", json!({"users": [{"id": "u1", "name": "Ana"}]})).await;
    mount(
        &server,
        "/deal_lost_reasons",
        json!({"deal_lost_reasons": [], "has_more": false}),
    )
    .await;
    mount(&server, "/campaigns", json!({"campaigns": [], "has_more": false})).await;

    let warehouse = RejectingWarehouse {
        inner: MemoryWarehouse::new(),
        rejected_table: "products",
    };
    let err = full_sync(&crm, &warehouse, "ns").await.unwrap_err();

    assert!(
        matches!(err, Error::Warehouse { ref destination, .. } if destination == "ns.products")
    );
    let written: Vec<String> = warehouse
        .inner
        .writes()
        .into_iter()
        .map(|w| w.destination)
        .collect();
    assert_eq!(written, vec!["ns.custom_fields", "ns.sources"]);
    assert_eq!(warehouse.inner.row_count("ns.sources"), 1);
    assert_eq!(warehouse.inner.row_count("ns.users"), 0);
}
