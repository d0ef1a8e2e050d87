//! Integration tests using a mock CRM server
//!
//! Tests the full end-to-end flow: token check → paginated resource calls →
//! flattened Arrow tables → warehouse writes

use pretty_assertions::assert_eq;
use rdcrm_sync::config::Settings;
use rdcrm_sync::crm::CrmClient;
use rdcrm_sync::http::HttpClientConfig;
use rdcrm_sync::sync::{full_sync, selective_sync, SelectiveSync, RESOURCE_TABLES};
use rdcrm_sync::warehouse::{DuckDbWarehouse, MemoryWarehouse, Warehouse};
use rdcrm_sync::{Error, OutputSelector, WriteMode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

async fn mount(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> CrmClient {
    Mock::given(method("GET"))
        .and(path("/token/check"))
        .and(query_param("token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    CrmClient::connect(Some("secret-token"), config).await.unwrap()
}

fn deal(id: &str, name: &str, segment: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "win": null,
        "amount_total": 1500,
        "created_at": "2024-03-01T12:30:00.000-03:00",
        "organization": {"name": "ACME Ltda"},
        "deal_stage": {"name": "Proposta"},
        "user": {"name": "Ana"},
        "deal_source": {"name": "Site"},
        "contacts": [{
            "name": "Bruno",
            "emails": [{"email": "bruno@acme.com"}],
            "phones": [{"phone": "+55 11 99999-0000"}]
        }],
        "deal_products": [
            {
                "product_id": "prod1",
                "name": "Plano Anual",
                "price": 1000,
                "amount": 1,
                "total": 1000
            },
            {"product_id": "prod2", "name": "Setup", "price": 500, "amount": 1, "total": 500}
        ],
        "deal_custom_fields": [{"custom_field_id": "cf1", "value": segment}]
    })
}

/// Two pipelines with one deal each and a single custom field
async fn mount_account(server: &MockServer) {
    mount(
        server,
        "/deal_pipelines",
        json!([
            {"id": "p1", "name": "Vendas", "deal_stages": [{"id": "s1"}]},
            {"id": "p2", "name": "Pós-Venda", "deal_stages": []}
        ]),
    )
    .await;
    mount(
        server,
        "/custom_fields",
        json!([{"id": "cf1", "label": "Segmento de Mercado", "for": "deal"}]),
    )
    .await;

    for (pipeline, stage) in [("p1", "Proposta"), ("p2", "Onboarding")] {
        Mock::given(method("GET"))
            .and(path("/deal_stages"))
            .and(query_param("deal_pipeline_id", pipeline))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deal_stages": [{
                    "id": format!("{pipeline}-s1"),
                    "name": stage,
                    "nickname": "P",
                    "order": 1,
                    "deal_pipeline": {"id": pipeline}
                }]
            })))
            .mount(server)
            .await;
    }

    mount(
        server,
        "/deal_sources",
        json!({"deal_sources": [{"id": "src1", "name": "Site"}], "has_more": false}),
    )
    .await;
    mount(
        server,
        "/products",
        json!({"products": [{"id": "prod1", "name": "Plano Anual", "base_price": 1000}]}),
    )
    .await;
    mount(
        server,
        "/teams",
        json!({"teams": [{"id": "t1", "name": "Inside", "team_users": [
            {"id": "u1", "name": "Ana"},
            {"id": "u2", "name": "Caio"}
        ]}]}),
    )
    .await;
    mount(
        server,
        "/users",
        json!({"users": [{"id": "u1", "name": "Ana", "email": "ana@acme.com"}]}),
    )
    .await;
    mount(
        server,
        "/deal_lost_reasons",
        json!({"deal_lost_reasons": [{"id": "l1", "label": "Preço"}], "has_more": false}),
    )
    .await;
    mount(
        server,
        "/campaigns",
        json!({"campaigns": [{"id": "c1", "name": "Black Friday"}], "has_more": false}),
    )
    .await;

    for (pipeline, deal_id, segment) in [("p1", "d1", "Varejo"), ("p2", "d2", "Indústria")] {
        Mock::given(method("GET"))
            .and(path("/deals"))
            .and(query_param("deal_pipeline_id", pipeline))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deals": [deal(deal_id, "Contrato", segment)],
                "has_more": false
            })))
            .mount(server)
            .await;
    }
}

// ============================================================================
// Full Sync
// ============================================================================

#[tokio::test]
async fn test_full_sync_into_memory() {
    let server = MockServer::start().await;
    let crm = connect(&server).await;
    mount_account(&server).await;

    let warehouse = MemoryWarehouse::new();
    let report = full_sync(&crm, &warehouse, "analytics.crm").await.unwrap();

    let mut expected: Vec<String> = RESOURCE_TABLES
        .iter()
        .map(|t| format!("analytics.crm.{t}"))
        .collect();
    expected.push("analytics.crm.deals_vendas".to_string());
    expected.push("analytics.crm.deals_posvenda".to_string());

    assert_eq!(report.written_destinations(), expected);
    assert!(report.skipped.is_empty());
    assert!(report.written.iter().all(|w| w.mode == WriteMode::Truncate));

    assert_eq!(warehouse.row_count("crm.stages"), 2);
    assert_eq!(warehouse.row_count("crm.deals_vendas"), 1);
    assert_eq!(warehouse.row_count("crm.deals_posvenda"), 1);

    let pipelines = &warehouse.table("crm.pipelines").unwrap()[0];
    assert!(pipelines.column_by_name("deal_stages").is_none());

    let deals = &warehouse.table("crm.deals_vendas").unwrap()[0];
    assert!(deals.column_by_name("segmento_de_mercado").is_some());
    assert!(deals.column_by_name("products").is_some());
    assert!(deals.column_by_name("email").is_some());
}

#[tokio::test]
async fn test_full_sync_into_duckdb() {
    let server = MockServer::start().await;
    let crm = connect(&server).await;
    mount_account(&server).await;

    let warehouse = DuckDbWarehouse::in_memory().unwrap();
    let report = full_sync(&crm, &warehouse, "crm").await.unwrap();
    assert_eq!(report.written.len(), RESOURCE_TABLES.len() + 2);

    assert_eq!(warehouse.row_count("crm.deals_vendas").unwrap(), Some(1));
    assert_eq!(warehouse.row_count("crm.teams").unwrap(), Some(1));

    let columns = warehouse.column_names("crm.deals_posvenda").unwrap();
    assert!(columns.iter().any(|c| c == "segmento_de_mercado"));
    assert!(columns.iter().any(|c| c == "contact_name"));

    // A second run replaces rather than accumulates
    full_sync(&crm, &warehouse, "crm").await.unwrap();
    assert_eq!(warehouse.row_count("crm.deals_vendas").unwrap(), Some(1));
}

// ============================================================================
// Selective Sync
// ============================================================================

#[tokio::test]
async fn test_selective_sync_deals_and_products_into_duckdb() {
    let server = MockServer::start().await;
    let crm = connect(&server).await;
    mount_account(&server).await;

    let warehouse = DuckDbWarehouse::in_memory().unwrap();
    let request = SelectiveSync::new("p1")
        .deals_to("proj.crm.deals_vendas")
        .with_products(true)
        .products_to("proj.crm.deal_products_vendas");
    let report = selective_sync(&crm, &warehouse, &request).await.unwrap();

    assert_eq!(report.written.len(), 2);
    assert_eq!(warehouse.row_count("crm.deals_vendas").unwrap(), Some(1));
    assert_eq!(
        warehouse.row_count("crm.deal_products_vendas").unwrap(),
        Some(2)
    );
    assert_eq!(warehouse.describe(), "duckdb://:memory:");
}

#[tokio::test]
async fn test_lenient_deals_keep_earlier_pages() {
    let server = MockServer::start().await;
    let crm = connect(&server).await;
    mount(&server, "/custom_fields", json!([{"id": "cf1", "label": "Segmento"}])).await;

    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deals": [deal("d1", "Primeiro", "Varejo")],
            "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let warehouse = MemoryWarehouse::new();
    let request = SelectiveSync::new("p1").deals_to("crm.deals_vendas");
    let report = selective_sync(&crm, &warehouse, &request).await.unwrap();
    assert_eq!(report.total_rows(), 1);
}

// ============================================================================
// Connection and Settings
// ============================================================================

#[tokio::test]
async fn test_rejected_token_stops_before_data_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/check"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deal_pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.crm.base_url = server.uri();
    settings.crm.token = Some("bad".to_string());

    let err = settings.connect_crm().await.unwrap_err();
    assert!(matches!(err, Error::Permission { ref body } if body == "invalid token"));
}

#[tokio::test]
async fn test_settings_drive_client_and_warehouse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    mount(
        &server,
        "/deal_pipelines",
        json!([{"id": "p1", "name": "Funil Principal"}]),
    )
    .await;

    let yaml = format!(
        "crm:\n  base_url: {}\n  token: abc\n  requests_per_second: 50\nwarehouse: memory\n",
        server.uri()
    );
    let settings = Settings::from_yaml(&yaml).unwrap();
    settings.validate().unwrap();

    let crm = settings.connect_crm().await.unwrap();
    let lookup = crm
        .pipelines(OutputSelector::Lookup)
        .await
        .unwrap()
        .into_lookup()
        .unwrap();
    assert_eq!(lookup.get("p1"), Some("funil_principal"));

    let warehouse = settings.open_warehouse().unwrap();
    assert_eq!(warehouse.describe(), "memory");
}
