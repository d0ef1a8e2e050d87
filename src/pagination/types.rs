//! Pagination types
//!
//! Typed results for each page and for each step of the page loop.

use crate::types::JsonValue;

/// What a single fetched page turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Well-formed envelope
    Fetched {
        /// Records on this page
        records: Vec<JsonValue>,
        /// Whether the API reports further pages
        has_more: bool,
    },
    /// Successful response whose envelope lacks the expected keys
    Malformed {
        /// Why the envelope was rejected
        reason: String,
    },
    /// Non-success HTTP status
    Failed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
}

impl PageOutcome {
    /// Check if this page was well formed
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }
}

/// Next move of the page loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    /// Fetch this page next
    Continue {
        /// Page number to request
        page: u32,
    },
    /// The API reported no further pages
    EndOfPages,
    /// A malformed page ended pagination early; accumulated records stand
    MalformedStop {
        /// Page that was malformed
        page: u32,
        /// Why it was rejected
        reason: String,
    },
}

impl PageStep {
    /// Check if the loop should fetch another page
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }
}

/// How to treat a malformed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Every malformed page is an error
    #[default]
    Strict,
    /// A malformed page after the first stops pagination, keeping prior records
    Lenient,
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone)]
pub struct PaginationState {
    /// Page number of the next request
    pub page: u32,
    /// Pages accepted so far
    pub pages_fetched: u32,
    /// Records accumulated so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
    /// Did a malformed page end pagination?
    pub stopped_early: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            pages_fetched: 0,
            total_fetched: 0,
            done: false,
            stopped_early: false,
        }
    }
}

impl PaginationState {
    /// Create a new pagination state starting at page 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no page has been accepted yet
    pub fn on_first_page(&self) -> bool {
        self.pages_fetched == 0
    }

    /// Record an accepted page
    pub fn accept_page(&mut self, records: u64) {
        self.pages_fetched += 1;
        self.total_fetched += records;
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Increment page number
    pub fn next_page(&mut self) {
        self.page += 1;
    }
}
