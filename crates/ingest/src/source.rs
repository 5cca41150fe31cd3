//! Seam between marketplace scrapers and the refresh pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use market_core::{RawListing, Result};

/// One page of scraped listings for a search query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub listings: Vec<RawListing>,
    /// Marketplace-reported result total, when the scrape saw one. The
    /// pipeline trusts whichever of this and the parsed count is larger.
    pub total_hint: Option<u32>,
}

impl ListingPage {
    pub fn from_listings(listings: Vec<RawListing>) -> Self {
        Self { listings, total_hint: None }
    }
}

/// A scraper that can answer active and sold queries for an item.
///
/// Implementations wrap real marketplace clients; tests hand the
/// pipeline canned pages.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_active(&self, query: &str) -> Result<ListingPage>;

    async fn fetch_sold(&self, query: &str) -> Result<ListingPage>;
}
