//! `has_more` page-number paginator

use super::types::{MalformedPolicy, PageOutcome, PageStep, PaginationState};
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Page size requested from paginated endpoints
pub const DEFAULT_PAGE_LIMIT: u32 = 200;

/// Page-number pagination driven by a `has_more` flag
///
/// Requests `?page=N&limit=L` starting at page 1 and keeps going while the
/// response envelope reports `has_more: true`.
#[derive(Debug, Clone)]
pub struct HasMorePaginator {
    /// Resource name used in errors
    pub resource: String,
    /// Key of the records array in the envelope
    pub records_key: String,
    /// Key of the boolean continuation flag
    pub has_more_key: String,
    /// Query parameter name for page number
    pub page_param: String,
    /// Query parameter name for page size
    pub limit_param: String,
    /// Page size value
    pub limit: u32,
    /// Malformed page handling
    pub policy: MalformedPolicy,
}

impl HasMorePaginator {
    /// Create a strict paginator reading records from `records_key`
    pub fn new(records_key: impl Into<String>) -> Self {
        let records_key = records_key.into();
        Self {
            resource: records_key.clone(),
            records_key,
            has_more_key: "has_more".to_string(),
            page_param: "page".to_string(),
            limit_param: "limit".to_string(),
            limit: DEFAULT_PAGE_LIMIT,
            policy: MalformedPolicy::Strict,
        }
    }

    /// Set page size
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set malformed page policy
    #[must_use]
    pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Query parameters for the page the state points at
    pub fn page_params(&self, state: &PaginationState) -> Vec<(String, String)> {
        vec![
            (self.page_param.clone(), state.page.to_string()),
            (self.limit_param.clone(), self.limit.to_string()),
        ]
    }

    /// Classify a raw page response
    pub fn classify(&self, status: u16, body: &str) -> PageOutcome {
        if !(200..300).contains(&status) {
            return PageOutcome::Failed {
                status,
                body: body.to_string(),
            };
        }

        let value: JsonValue = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                return PageOutcome::Malformed {
                    reason: format!("response is not JSON: {e}"),
                }
            }
        };

        self.classify_json(&value)
    }

    /// Classify an already-parsed envelope
    pub fn classify_json(&self, value: &JsonValue) -> PageOutcome {
        let Some(records) = value.get(&self.records_key).and_then(JsonValue::as_array) else {
            return PageOutcome::Malformed {
                reason: format!("missing '{}' array", self.records_key),
            };
        };
        let Some(has_more) = value.get(&self.has_more_key).and_then(JsonValue::as_bool) else {
            return PageOutcome::Malformed {
                reason: format!("missing '{}' flag", self.has_more_key),
            };
        };

        PageOutcome::Fetched {
            records: records.clone(),
            has_more,
        }
    }

    /// Fold one page into the accumulator and decide the next step
    pub fn advance(
        &self,
        outcome: PageOutcome,
        state: &mut PaginationState,
        sink: &mut Vec<JsonValue>,
    ) -> Result<PageStep> {
        let tolerate = self.policy == MalformedPolicy::Lenient && !state.on_first_page();

        match outcome {
            PageOutcome::Fetched { records, has_more } => {
                state.accept_page(records.len() as u64);
                sink.extend(records);

                if has_more {
                    state.next_page();
                    Ok(PageStep::Continue { page: state.page })
                } else {
                    state.mark_done();
                    Ok(PageStep::EndOfPages)
                }
            }
            PageOutcome::Malformed { reason } if tolerate => {
                state.mark_done();
                state.stopped_early = true;
                Ok(PageStep::MalformedStop {
                    page: state.page,
                    reason,
                })
            }
            PageOutcome::Failed { status, .. } if tolerate => {
                state.mark_done();
                state.stopped_early = true;
                Ok(PageStep::MalformedStop {
                    page: state.page,
                    reason: format!("HTTP {status}"),
                })
            }
            PageOutcome::Malformed { reason } => Err(Error::malformed(
                &self.resource,
                format!("page {}: {reason}", state.page),
            )),
            PageOutcome::Failed { status, body } => Err(Error::http_status(status, body)),
        }
    }
}
