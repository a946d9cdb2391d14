//! Finding a named seller's listing among the results.

use crate::config::ScrapeConfig;
use crate::error::StageError;
use crate::locator::ElementQuery;
use crate::outcome::{Outcome, SoftIssue};
use crate::renderer::{LoadState, RenderContext};
use crate::site;
use crate::types::Listing;

use super::extract::ListingExtractor;
use super::{settle, wait_soft};

/// Scans result cards for a seller name and extracts the first hit.
pub struct StoreMatcher<'a> {
    config: &'a ScrapeConfig,
    extractor: &'a ListingExtractor<'a>,
}

impl<'a> StoreMatcher<'a> {
    pub fn new(config: &'a ScrapeConfig, extractor: &'a ListingExtractor<'a>) -> Self {
        Self { config, extractor }
    }

    /// Look for `store_name` on the results page at `results_url`.
    ///
    /// The context is expected to sit on a listing page opened from the
    /// results; it is sent back there first. `Ok(None)` means no card within
    /// the scan limit mentions the store.
    pub async fn find_store(
        &self,
        ctx: &mut dyn RenderContext,
        store_name: &str,
        results_url: &str,
    ) -> Outcome<Option<Listing>> {
        let mut issues = Vec::new();

        if let Err(e) = self.return_to_results(ctx, results_url).await {
            return Outcome::failed(e);
        }
        wait_soft(
            &*ctx,
            LoadState::NetworkIdle,
            self.config.timeouts.network_idle_ms,
            "results page",
            &mut issues,
        )
        .await;
        settle(self.config.pauses.after_back).await;

        tracing::info!("Looking for store: {store_name}");
        let all_cards = ElementQuery::css(site::STORE_CARDS);
        let total = match ctx.count(&all_cards).await {
            Ok(n) => n,
            Err(e) => {
                return Outcome::Failure {
                    error: StageError::browser(e),
                    issues,
                }
            }
        };
        let limit = total.min(self.config.store_scan_limit);
        let needle = store_name.to_lowercase();

        for i in 0..limit {
            let card = all_cards.clone().nth(i);
            let html = match ctx.inner_html(&card).await {
                Ok(Some(html)) => html,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("Could not read card {}: {e:#}", i + 1);
                    continue;
                }
            };
            if !html.to_lowercase().contains(&needle) {
                continue;
            }

            let position = i + 1;
            tracing::info!("Found {store_name} listing at position {position}");
            return match self.extractor.extract_card(ctx, &card, &mut issues).await {
                Ok(listing) => {
                    tracing::info!("Store price: {} - {}", listing.price, listing.title);
                    Outcome::from_parts(Some(listing), issues)
                }
                Err(e) => {
                    tracing::warn!("Store listing at position {position} unreadable: {e}");
                    issues.push(SoftIssue::StoreListingUnreadable {
                        position,
                        reason: e.to_string(),
                    });
                    Outcome::from_parts(None, issues)
                }
            };
        }

        tracing::info!(
            "No listing from {store_name} among the first {limit} of {total} results"
        );
        Outcome::from_parts(None, issues)
    }

    /// History back; re-open `results_url` if that does not work.
    async fn return_to_results(
        &self,
        ctx: &mut dyn RenderContext,
        results_url: &str,
    ) -> Result<(), StageError> {
        let timeout_ms = self.config.timeouts.navigation_ms;
        match ctx.go_back(timeout_ms).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!("History back failed ({e:#}), reopening {results_url}");
                ctx.navigate(results_url, timeout_ms)
                    .await
                    .map(|_| ())
                    .map_err(|e| StageError::Navigation {
                        url: results_url.to_string(),
                        reason: format!("{e:#}"),
                    })
            }
        }
    }
}
