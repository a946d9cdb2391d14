//! Listing extraction from result cards and detail pages.

use url::Url;

use crate::config::ScrapeConfig;
use crate::error::StageError;
use crate::locator::{css_candidates, scoped_candidates, ElementQuery, Locator};
use crate::outcome::{Outcome, SoftIssue};
use crate::price::{PriceAmount, PriceNormalizer};
use crate::region::RegionProfile;
use crate::renderer::{LoadState, RenderContext};
use crate::selector::{first_match, resolve_present, wait_visible};
use crate::site;
use crate::types::Listing;

use super::{settle, wait_soft};

/// Title used when neither the title element nor the link has text.
pub const PLACEHOLDER_TITLE: &str = "Product Title";

/// Longest title taken from raw link text.
const LINK_TITLE_MAX_CHARS: usize = 100;

/// Reads listings: card → link/title/id → detail page → price.
pub struct ListingExtractor<'a> {
    config: &'a ScrapeConfig,
    region: &'static RegionProfile,
    normalizer: PriceNormalizer,
}

impl<'a> ListingExtractor<'a> {
    pub fn new(config: &'a ScrapeConfig, region: &'static RegionProfile) -> Self {
        Self {
            config,
            region,
            normalizer: config.normalizer_for(region),
        }
    }

    /// Extract the first result on the current results page.
    pub async fn extract_lowest(&self, ctx: &mut dyn RenderContext) -> Outcome<Listing> {
        let candidates = css_candidates(site::FIRST_CARD);
        let Some(card) = resolve_present(&*ctx, &candidates).await else {
            return Outcome::failed(StageError::ListingNotFound);
        };
        tracing::info!("Located first result ({card})");

        let mut issues = Vec::new();
        match self.extract_card(ctx, card, &mut issues).await {
            Ok(listing) => {
                tracing::info!("Lowest price: {} - {}", listing.price, listing.title);
                Outcome::from_parts(listing, issues)
            }
            Err(error) => Outcome::Failure { error, issues },
        }
    }

    /// Read the listing behind `card` by following it to its detail page.
    ///
    /// Leaves the context on the detail page.
    pub async fn extract_card(
        &self,
        ctx: &mut dyn RenderContext,
        card: &ElementQuery,
        issues: &mut Vec<SoftIssue>,
    ) -> Result<Listing, StageError> {
        let links = scoped_candidates(card, site::CARD_LINK);
        let link = resolve_present(&*ctx, &links)
            .await
            .ok_or(StageError::LinkNotFound)?;

        let title = self.read_title(&*ctx, link).await;
        tracing::debug!("Title: {title}");

        let listing_id = ctx
            .attribute(card, site::LISTING_ID_ATTR)
            .await
            .ok()
            .flatten()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let url = match &listing_id {
            Some(id) => self.region.listing_url(id),
            None => {
                let href = ctx
                    .attribute(link, "href")
                    .await
                    .map_err(StageError::browser)?
                    .ok_or(StageError::LinkNotFound)?;
                self.absolute(&href)
            }
        };
        tracing::info!("Opening listing {url}");

        match ctx.navigate(&url, self.config.timeouts.navigation_ms).await {
            Ok(nav) => tracing::debug!("Listing page loaded in {}ms", nav.load_time_ms),
            Err(e) => {
                return Err(StageError::Navigation {
                    url,
                    reason: format!("{e:#}"),
                })
            }
        }
        wait_soft(
            &*ctx,
            LoadState::DomContentLoaded,
            self.config.timeouts.dom_ready_ms,
            "listing page",
            issues,
        )
        .await;
        settle(self.config.pauses.after_detail).await;

        let price = self
            .read_price(&*ctx)
            .await
            .ok_or_else(|| StageError::PriceNotFound { url: url.clone() })?;
        tracing::info!("Found price: {price}");

        Ok(Listing {
            title,
            price,
            url,
            listing_id,
        })
    }

    async fn read_title(&self, ctx: &dyn RenderContext, link: &ElementQuery) -> String {
        let title_el = link.child(Locator::css(site::LINK_TITLE));
        if let Some(title) = non_empty_text(ctx, &title_el).await {
            return title;
        }
        match non_empty_text(ctx, link).await {
            Some(text) => text.chars().take(LINK_TITLE_MAX_CHARS).collect(),
            None => PLACEHOLDER_TITLE.to_string(),
        }
    }

    /// First price candidate that is visible and normalizes.
    async fn read_price(&self, ctx: &dyn RenderContext) -> Option<PriceAmount> {
        let candidates = css_candidates(site::DETAIL_PRICE);
        let timeout_ms = self.config.timeouts.selector_ms;
        let normalizer = self.normalizer;

        first_match(&candidates, |q| async move {
            if !wait_visible(ctx, q, timeout_ms).await {
                return None;
            }
            let text = ctx.text_content(q).await.ok().flatten()?;
            let price = normalizer.normalize(&text);
            if price.is_none() {
                tracing::debug!("Price text {text:?} at {q} did not parse");
            }
            price
        })
        .await
        .map(|(_, price)| price)
    }

    fn absolute(&self, href: &str) -> String {
        Url::parse(self.region.base_url)
            .and_then(|base| base.join(href))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string())
    }
}

async fn non_empty_text(ctx: &dyn RenderContext, query: &ElementQuery) -> Option<String> {
    ctx.text_content(query)
        .await
        .ok()
        .flatten()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}
