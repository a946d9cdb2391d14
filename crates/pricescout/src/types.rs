//! Core data types for scrape queries and their results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::price::PriceAmount;
use crate::region::{self, RegionProfile};

/// One product offer found on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: PriceAmount,
    pub url: String,
    pub listing_id: Option<String>,
}

/// A validated request for one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeQuery {
    pub search_term: String,
    pub region: &'static RegionProfile,
    pub headless: bool,
    pub store_name: Option<String>,
}

impl ScrapeQuery {
    /// Build a query, rejecting an empty search term.
    ///
    /// Unknown region codes fall back to the default profile. A blank store
    /// name is treated as absent.
    pub fn new(
        search_term: &str,
        region_code: &str,
        headless: bool,
        store_name: Option<&str>,
    ) -> Result<Self, ScrapeError> {
        let search_term = search_term.trim();
        if search_term.is_empty() {
            return Err(ScrapeError::InvalidQuery(
                "search term must not be empty".to_string(),
            ));
        }

        let store_name = store_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Self {
            search_term: search_term.to_string(),
            region: region::resolve(region_code),
            headless,
            store_name,
        })
    }
}

/// How the caller's listing compares with the lowest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "difference", rename_all = "snake_case")]
pub enum PriceComparison {
    MoreExpensive(Decimal),
    Cheaper(Decimal),
    Match,
}

/// Output of a successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub lowest: Listing,
    pub your_store: Option<Listing>,
}

impl ScrapeResult {
    /// `your price - lowest price`, when both are in the same currency.
    pub fn price_difference(&self) -> Option<Decimal> {
        let yours = self.your_store.as_ref()?;
        if yours.price.currency != self.lowest.price.currency {
            tracing::debug!(
                "Skipping comparison: {} vs {}",
                yours.price.currency,
                self.lowest.price.currency
            );
            return None;
        }
        Some(yours.price.value - self.lowest.price.value)
    }

    pub fn comparison(&self) -> Option<PriceComparison> {
        let diff = self.price_difference()?;
        Some(if diff > Decimal::ZERO {
            PriceComparison::MoreExpensive(diff)
        } else if diff < Decimal::ZERO {
            PriceComparison::Cheaper(diff.abs())
        } else {
            PriceComparison::Match
        })
    }
}
