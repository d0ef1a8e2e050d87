//! Sync request and report types

use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use crate::warehouse::WriteSummary;

/// Request to rebuild the deals and/or deal-product tables of one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectiveSync {
    /// Pipeline whose deals are fetched
    pub pipeline_id: String,
    /// Destination of the deals table
    pub deals_destination: Option<String>,
    /// Destination of the deal-product table
    pub products_destination: Option<String>,
    /// Rebuild the deals table
    pub deals: bool,
    /// Rebuild the deal-product table
    pub products: bool,
}

impl SelectiveSync {
    /// Deals only, no destinations yet
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            deals_destination: None,
            products_destination: None,
            deals: true,
            products: false,
        }
    }

    /// Set the deals destination
    #[must_use]
    pub fn deals_to(mut self, destination: impl Into<String>) -> Self {
        self.deals_destination = Some(destination.into());
        self
    }

    /// Set the deal-product destination
    #[must_use]
    pub fn products_to(mut self, destination: impl Into<String>) -> Self {
        self.products_destination = Some(destination.into());
        self
    }

    /// Toggle the deals table
    #[must_use]
    pub fn with_deals(mut self, enabled: bool) -> Self {
        self.deals = enabled;
        self
    }

    /// Toggle the deal-product table
    #[must_use]
    pub fn with_products(mut self, enabled: bool) -> Self {
        self.products = enabled;
        self
    }

    /// Validate the request and decide what to fetch
    ///
    /// Blank destinations count as missing.
    pub fn plan(&self) -> Result<SelectivePlan> {
        let deals_destination = self.deals_destination.clone().none_if_blank();
        let products_destination = self.products_destination.clone().none_if_blank();

        if (self.deals && deals_destination.is_none())
            || (self.products && products_destination.is_none())
        {
            return Err(Error::config("every selected table needs a destination"));
        }

        let plan = match (deals_destination, products_destination) {
            (Some(deals), Some(products)) if self.deals && self.products => {
                Ok(SelectivePlan::DealsAndProducts {
                    deals_destination: deals,
                    products_destination: products,
                })
            }
            (Some(deals), _) if self.deals => Ok(SelectivePlan::DealsOnly {
                deals_destination: deals,
            }),
            (_, Some(products)) if self.products => Ok(SelectivePlan::ProductsOnly {
                products_destination: products,
            }),
            _ => Err(Error::config(
                "nothing to do: enable deals, products or both",
            )),
        }?;

        if self.pipeline_id.trim().is_empty() {
            return Err(Error::missing_field("pipeline_id"));
        }
        Ok(plan)
    }
}

/// Validated selective sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectivePlan {
    /// One deals fetch feeding both tables
    DealsAndProducts {
        /// Deals table destination
        deals_destination: String,
        /// Deal-product table destination
        products_destination: String,
    },
    /// Deal-product table from a product-filtered fetch
    ProductsOnly {
        /// Deal-product table destination
        products_destination: String,
    },
    /// Deals table only
    DealsOnly {
        /// Deals table destination
        deals_destination: String,
    },
}

/// What a sync wrote and what it skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Confirmed writes in order
    pub written: Vec<WriteSummary>,
    /// Destinations skipped because their table had no rows and no columns
    pub skipped: Vec<String>,
}

impl SyncReport {
    /// Destinations written, in order
    pub fn written_destinations(&self) -> Vec<&str> {
        self.written.iter().map(|w| w.destination.as_str()).collect()
    }

    /// Total rows written
    pub fn total_rows(&self) -> usize {
        self.written.iter().map(|w| w.rows).sum()
    }
}
