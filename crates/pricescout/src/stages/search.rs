//! Query submission and result classification.

use crate::config::ScrapeConfig;
use crate::dom;
use crate::error::StageError;
use crate::locator::{css_candidates, ElementQuery};
use crate::outcome::{Outcome, SoftIssue};
use crate::region::RegionProfile;
use crate::renderer::{LoadState, RenderContext};
use crate::selector::{resolve_visible, wait_for_count};
use crate::site;

use super::consent::ConsentHandler;
use super::{settle, wait_soft};

/// What a search turned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// At least one result card (or an unconfirmed page) at `results_url`.
    Found { results_url: String, card_count: usize },
    /// The storefront reported zero matches.
    NoResults,
}

/// Submits a query through the storefront's search box.
pub struct SearchStage<'a> {
    config: &'a ScrapeConfig,
    region: &'static RegionProfile,
}

impl<'a> SearchStage<'a> {
    pub fn new(config: &'a ScrapeConfig, region: &'static RegionProfile) -> Self {
        Self { config, region }
    }

    pub async fn run(&self, ctx: &mut dyn RenderContext, term: &str) -> Outcome<SearchOutcome> {
        let timeouts = &self.config.timeouts;
        let pauses = &self.config.pauses;
        let mut issues = Vec::new();

        tracing::info!("Searching {} for \"{term}\"", self.region.base_url);
        let home = self.region.base_url;
        match ctx.navigate(home, timeouts.navigation_ms).await {
            Ok(nav) => tracing::debug!("Home page {} loaded in {}ms", nav.final_url, nav.load_time_ms),
            Err(e) => {
                return Outcome::failed(StageError::Navigation {
                    url: home.to_string(),
                    reason: format!("{e:#}"),
                })
            }
        }
        settle(pauses.after_home).await;

        ConsentHandler::new(timeouts.optional_selector_ms, pauses.after_consent)
            .attempt(ctx)
            .await;

        self.set_delivery_location(&*ctx, &mut issues).await;

        let inputs = css_candidates(site::SEARCH_INPUT);
        let Some(input) = resolve_visible(&*ctx, &inputs, timeouts.selector_ms).await else {
            return Outcome::Failure {
                error: StageError::SearchInputNotFound,
                issues,
            };
        };

        tracing::debug!("Typing search term into {input}");
        if let Err(e) = ctx.fill(input, term).await {
            return Outcome::Failure {
                error: StageError::browser(e),
                issues,
            };
        }
        settle(pauses.after_fill).await;

        if let Err(e) = self.submit(ctx, input).await {
            return Outcome::Failure {
                error: StageError::browser(e),
                issues,
            };
        }

        wait_soft(
            &*ctx,
            LoadState::DomContentLoaded,
            timeouts.dom_ready_ms,
            "search",
            &mut issues,
        )
        .await;
        settle(pauses.after_results).await;

        let results_url = ctx.get_url().await.unwrap_or_default();
        tracing::debug!("Results page: {results_url}");

        let sentinels = site::no_results_sentinels();
        if let Some(sentinel) = resolve_visible(&*ctx, &sentinels, timeouts.sentinel_ms).await {
            tracing::info!("No results for \"{term}\" ({sentinel})");
            return Outcome::from_parts(SearchOutcome::NoResults, issues);
        }

        let cards = ElementQuery::css(site::RESULT_CARDS);
        match wait_for_count(&*ctx, &cards, timeouts.results_ms).await {
            Ok(0) => {
                tracing::info!("No product listings on the results page");
                Outcome::from_parts(SearchOutcome::NoResults, issues)
            }
            Ok(card_count) => {
                tracing::info!("Found {card_count} product listings");
                Outcome::from_parts(
                    SearchOutcome::Found {
                        results_url,
                        card_count,
                    },
                    issues,
                )
            }
            Err(e) => {
                tracing::warn!("Could not count product listings, continuing: {e:#}");
                issues.push(SoftIssue::ResultsNotConfirmed);
                Outcome::from_parts(
                    SearchOutcome::Found {
                        results_url,
                        card_count: 0,
                    },
                    issues,
                )
            }
        }
    }

    async fn set_delivery_location(&self, ctx: &dyn RenderContext, issues: &mut Vec<SoftIssue>) {
        let script = dom::delivery_location_script(self.region.postcode, self.region.code);
        match ctx.execute_js(&script).await {
            Ok(_) => tracing::info!(
                "Delivery location set to {} ({})",
                self.region.code,
                self.region.postcode
            ),
            Err(e) => {
                tracing::warn!("Could not set delivery location: {e:#}");
                issues.push(SoftIssue::DeliveryLocation {
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    /// Click the submit control, or press Enter in the input when there is none.
    async fn submit(&self, ctx: &mut dyn RenderContext, input: &ElementQuery) -> anyhow::Result<()> {
        let buttons = css_candidates(site::SEARCH_SUBMIT);
        match resolve_visible(&*ctx, &buttons, self.config.timeouts.optional_selector_ms).await {
            Some(button) => {
                tracing::debug!("Submitting search via {button}");
                ctx.click(button).await
            }
            None => {
                tracing::debug!("No submit control, pressing Enter");
                ctx.press_enter(input).await
            }
        }
    }
}
