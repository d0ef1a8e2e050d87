//! RD Station CRM API client

use super::types::{DealProductSource, LookupTable, ResourceOutput};
use crate::deals::{assemble_deals_table, flatten_deal, product_lines};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::pagination::{HasMorePaginator, MalformedPolicy, PageStep, PaginationState};
use crate::table::{CoercionPolicy, RowSet};
use crate::types::{id_text, JsonObject, JsonValue, OptionStringExt, OutputSelector};
use arrow::record_batch::RecordBatch;
use tracing::{debug, info, warn};

/// Public API root
pub const DEFAULT_BASE_URL: &str = "https://crm.rdstation.com/api/v1";

/// Page size for the stage listing
pub const STAGE_PAGE_LIMIT: u32 = 12;

/// Columns of the combined stages table
pub const GENERAL_STAGE_COLUMNS: [&str; 10] = [
    "deal_pipeline_id",
    "deal_pipeline_name",
    "id",
    "name",
    "nickname",
    "order",
    "created_at",
    "updated_at",
    "objective",
    "description",
];

/// Authenticated client for the CRM API
///
/// Requests are issued one at a time. Every request carries the access token
/// as the `token` query parameter.
pub struct CrmClient {
    http: HttpClient,
    token: String,
}

impl CrmClient {
    /// Validate the token against the API and build a client
    ///
    /// A missing or blank token fails before any request is made.
    pub async fn connect(token: Option<&str>, mut config: HttpClientConfig) -> Result<Self> {
        let token = token
            .map(str::to_string)
            .none_if_blank()
            .ok_or_else(|| Error::auth("an access token is required"))?;

        if config.base_url.is_none() {
            config.base_url = Some(DEFAULT_BASE_URL.to_string());
        }

        let client = Self {
            http: HttpClient::with_config(config)?,
            token,
        };

        let (status, body) = client
            .http
            .get_text("/token/check", client.request())
            .await?;
        if !(200..300).contains(&status) {
            return Err(Error::Permission { body });
        }
        debug!("Access token accepted");

        Ok(client)
    }

    /// Base request carrying the token
    fn request(&self) -> RequestConfig {
        RequestConfig::new().query("token", self.token.as_str())
    }

    async fn fetch_json(&self, path: &str, config: RequestConfig) -> Result<JsonValue> {
        self.http.get_json_with_config(path, config).await
    }

    /// Walk every page of a `has_more` endpoint
    async fn paginate(
        &self,
        path: &str,
        params: &[(&str, &str)],
        paginator: &HasMorePaginator,
    ) -> Result<Vec<JsonValue>> {
        let mut state = PaginationState::new();
        let mut records = Vec::new();

        loop {
            let mut config = self.request();
            for (key, value) in params {
                config = config.query(*key, *value);
            }
            let config = config.queries(paginator.page_params(&state));

            let (status, body) = self.http.get_text(path, config).await?;
            let outcome = paginator.classify(status, &body);

            match paginator.advance(outcome, &mut state, &mut records)? {
                PageStep::Continue { page } => {
                    debug!("{}: {} records so far, next page {}", path, records.len(), page);
                }
                PageStep::EndOfPages => break,
                PageStep::MalformedStop { page, reason } => {
                    warn!(
                        "{}: stopping at page {} ({}), keeping {} records",
                        path,
                        page,
                        reason,
                        records.len()
                    );
                    break;
                }
            }
        }

        debug!(
            "{}: {} records over {} pages",
            path, state.total_fetched, state.pages_fetched
        );
        Ok(records)
    }

    /// Fetch a list endpoint whose response is the bare array
    async fn fetch_array(&self, path: &str, config: RequestConfig) -> Result<Vec<JsonValue>> {
        match self.fetch_json(path, config).await? {
            JsonValue::Array(records) => Ok(records),
            _ => Err(Error::malformed(path, "expected a JSON array")),
        }
    }

    /// Fetch a single page whose records sit under `key`
    async fn fetch_enveloped(
        &self,
        path: &str,
        key: &str,
        config: RequestConfig,
    ) -> Result<Vec<JsonValue>> {
        let mut body = self.fetch_json(path, config).await?;
        match body.get_mut(key).map(JsonValue::take) {
            Some(JsonValue::Array(records)) => Ok(records),
            _ => Err(Error::malformed(path, format!("missing '{key}' array"))),
        }
    }

    // ========================================================================
    // Lookup resources
    // ========================================================================

    async fn fetch_pipelines(&self) -> Result<Vec<JsonValue>> {
        let records = self
            .fetch_array("/deal_pipelines", self.request().query("limit", "200"))
            .await?;
        info!("Fetched {} pipelines", records.len());
        Ok(records)
    }

    fn pipeline_table(records: &[JsonValue]) -> Result<RecordBatch> {
        let mut set = RowSet::from_records(records);
        set.drop_column("deal_stages");
        set.to_record_batch(CoercionPolicy::Resource)
    }

    async fn fetch_custom_fields(&self) -> Result<Vec<JsonValue>> {
        let records = self.fetch_array("/custom_fields", self.request()).await?;
        info!("Fetched {} custom fields", records.len());
        Ok(records)
    }

    fn custom_field_table(records: &[JsonValue]) -> Result<RecordBatch> {
        RowSet::from_records(records).to_record_batch(CoercionPolicy::Resource)
    }

    /// Sales pipelines (a single request of up to 200)
    ///
    /// The nested stage list is dropped from the table; the lookup maps
    /// pipeline id to normalized pipeline name.
    pub async fn pipelines(&self, output: OutputSelector) -> Result<ResourceOutput> {
        let records = self.fetch_pipelines().await?;
        let table = if output.wants_table() {
            Some(Self::pipeline_table(&records)?)
        } else {
            None
        };
        let lookup = LookupTable::from_records(&records, "id", "name");
        Ok(ResourceOutput::select(output, table, lookup))
    }

    /// Pipelines table together with its id → name lookup
    pub async fn pipelines_with_lookup(&self) -> Result<(RecordBatch, LookupTable)> {
        let records = self.fetch_pipelines().await?;
        let table = Self::pipeline_table(&records)?;
        Ok((table, LookupTable::from_records(&records, "id", "name")))
    }

    /// Custom field definitions; the lookup maps field id to normalized label
    pub async fn custom_fields(&self, output: OutputSelector) -> Result<ResourceOutput> {
        let records = self.fetch_custom_fields().await?;
        let table = if output.wants_table() {
            Some(Self::custom_field_table(&records)?)
        } else {
            None
        };
        let lookup = LookupTable::from_records(&records, "id", "label");
        Ok(ResourceOutput::select(output, table, lookup))
    }

    /// Custom fields table together with its id → label lookup
    pub async fn custom_fields_with_lookup(&self) -> Result<(RecordBatch, LookupTable)> {
        let records = self.fetch_custom_fields().await?;
        let table = Self::custom_field_table(&records)?;
        Ok((table, LookupTable::from_records(&records, "id", "label")))
    }

    /// Custom field id → label lookup, without building the table
    pub async fn custom_field_lookup(&self) -> Result<LookupTable> {
        let records = self.fetch_custom_fields().await?;
        Ok(LookupTable::from_records(&records, "id", "label"))
    }

    // ========================================================================
    // Stages
    // ========================================================================

    async fn stage_rows(&self, pipeline_id: &str) -> Result<RowSet> {
        let config = self
            .request()
            .query("deal_pipeline_id", pipeline_id)
            .query("limit", STAGE_PAGE_LIMIT.to_string());
        let records = self
            .fetch_enveloped("/deal_stages", "deal_stages", config)
            .await?;
        Ok(RowSet::from_records(&records))
    }

    /// Stages of one pipeline
    pub async fn pipeline_stages(&self, pipeline_id: &str) -> Result<RecordBatch> {
        self.stage_rows(pipeline_id)
            .await?
            .to_record_batch(CoercionPolicy::Resource)
    }

    /// Stages of every pipeline in lookup order, projected to the shared columns
    pub async fn general_stages(&self, pipelines: &LookupTable) -> Result<RecordBatch> {
        let mut combined = RowSet::new();
        for pipeline_id in pipelines.ids() {
            let rows = self.stage_rows(pipeline_id).await?;
            combined.extend(rows.select(&GENERAL_STAGE_COLUMNS));
        }
        combined.to_record_batch(CoercionPolicy::Resource)
    }

    // ========================================================================
    // Plain resources
    // ========================================================================

    async fn paginated_table(&self, path: &str, key: &str) -> Result<RecordBatch> {
        let records = self
            .paginate(path, &[], &HasMorePaginator::new(key))
            .await?;
        RowSet::from_records(&records).to_record_batch(CoercionPolicy::Resource)
    }

    /// Deal sources, all pages
    pub async fn sources(&self) -> Result<RecordBatch> {
        self.paginated_table("/deal_sources", "deal_sources").await
    }

    /// Products (a single request of up to 200)
    pub async fn products(&self) -> Result<RecordBatch> {
        let records = self
            .fetch_enveloped("/products", "products", self.request().query("limit", "200"))
            .await?;
        RowSet::from_records(&records).to_record_batch(CoercionPolicy::Resource)
    }

    /// Teams with their members collapsed to comma-separated ids and names
    pub async fn teams(&self) -> Result<RecordBatch> {
        let records = self
            .fetch_enveloped("/teams", "teams", self.request())
            .await?;
        RowSet::from_rows(records.iter().map(collapse_team))
            .to_record_batch(CoercionPolicy::Resource)
    }

    /// Account users
    pub async fn users(&self) -> Result<RecordBatch> {
        let records = self
            .fetch_enveloped("/users", "users", self.request())
            .await?;
        RowSet::from_records(&records).to_record_batch(CoercionPolicy::Resource)
    }

    /// Deal lost reasons, all pages
    pub async fn deal_lost_reasons(&self) -> Result<RecordBatch> {
        self.paginated_table("/deal_lost_reasons", "deal_lost_reasons")
            .await
    }

    /// Campaigns, all pages
    pub async fn campaigns(&self) -> Result<RecordBatch> {
        self.paginated_table("/campaigns", "campaigns").await
    }

    // ========================================================================
    // Deals
    // ========================================================================

    /// Raw deals of one pipeline
    ///
    /// A malformed page after the first ends the listing with the deals
    /// gathered so far.
    pub async fn pipeline_deals_raw(&self, pipeline_id: &str) -> Result<Vec<JsonValue>> {
        let paginator = HasMorePaginator::new("deals").with_policy(MalformedPolicy::Lenient);
        self.paginate("/deals", &[("deal_pipeline_id", pipeline_id)], &paginator)
            .await
    }

    /// Flattened deals table of one pipeline
    pub async fn pipeline_deals(
        &self,
        pipeline_id: &str,
        custom_fields: &LookupTable,
    ) -> Result<RecordBatch> {
        let (table, _) = self
            .pipeline_deals_with_raw(pipeline_id, custom_fields)
            .await?;
        Ok(table)
    }

    /// Flattened deals table together with the raw deals it came from
    pub async fn pipeline_deals_with_raw(
        &self,
        pipeline_id: &str,
        custom_fields: &LookupTable,
    ) -> Result<(RecordBatch, Vec<JsonValue>)> {
        let raw = self.pipeline_deals_raw(pipeline_id).await?;
        let rows = raw
            .iter()
            .map(|deal| flatten_deal(deal, custom_fields))
            .collect::<Result<Vec<_>>>()?;
        let table = assemble_deals_table(rows)?;
        info!("Pipeline {}: {} deals", pipeline_id, table.num_rows());
        Ok((table, raw))
    }

    /// Deals table of every pipeline, named `deals_<pipeline name>`
    pub async fn all_pipeline_deals(
        &self,
        custom_fields: &LookupTable,
        pipelines: &LookupTable,
    ) -> Result<Vec<(String, RecordBatch)>> {
        let mut tables = Vec::with_capacity(pipelines.len());
        for (pipeline_id, name) in pipelines.iter() {
            let table = self.pipeline_deals(pipeline_id, custom_fields).await?;
            tables.push((format!("deals_{name}"), table));
        }
        Ok(tables)
    }

    /// Deal-product lines from a fresh fetch or from raw deals already at hand
    ///
    /// A fresh fetch whose first response is not a success is reported as
    /// [`Error::DataSource`] with the response body.
    pub async fn deals_products(&self, source: DealProductSource<'_>) -> Result<RecordBatch> {
        match source {
            DealProductSource::Prefetched(deals) => product_lines(deals),
            DealProductSource::Fetch { pipeline_id } => {
                let paginator =
                    HasMorePaginator::new("deals").with_policy(MalformedPolicy::Lenient);
                let params = [
                    ("deal_pipeline_id", pipeline_id),
                    ("product_presence", "true"),
                ];
                let deals = self
                    .paginate("/deals", &params, &paginator)
                    .await
                    .map_err(|e| match e {
                        Error::HttpStatus { status, body } => Error::DataSource { status, body },
                        other => other,
                    })?;
                product_lines(&deals)
            }
        }
    }
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

/// Team row with members joined into `user_ids` and `usernames`
fn collapse_team(team: &JsonValue) -> JsonObject {
    let members = team
        .get("team_users")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let user_ids: Vec<String> = members
        .iter()
        .filter_map(|u| u.get("id").and_then(id_text))
        .collect();
    let usernames: Vec<&str> = members
        .iter()
        .filter_map(|u| u.get("name").and_then(JsonValue::as_str))
        .collect();

    let mut row = JsonObject::new();
    for key in ["id", "name", "created_at", "updated_at"] {
        row.insert(
            key.to_string(),
            team.get(key).cloned().unwrap_or(JsonValue::Null),
        );
    }
    row.insert("user_ids".into(), JsonValue::String(user_ids.join(", ")));
    row.insert("usernames".into(), JsonValue::String(usernames.join(", ")));
    row
}
