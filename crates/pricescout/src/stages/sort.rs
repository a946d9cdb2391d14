//! Reordering results by ascending total price.
//!
//! Two strategies sit behind [`SortStrategy`]: rewriting the results URL
//! with the storefront's sort parameter, and driving the sort dropdown.
//! A failed sort never ends a scrape; the caller records it and carries on
//! with the results in their existing order.

use async_trait::async_trait;
use url::Url;

use crate::config::{Pauses, SortMode, Timeouts};
use crate::error::StageError;
use crate::locator::css_candidates;
use crate::outcome::{Outcome, SoftIssue};
use crate::renderer::{LoadState, RenderContext};
use crate::selector::resolve_visible;
use crate::site;

use super::{settle, wait_soft};

/// A way of sorting the current results page. Yields the sorted page's URL.
#[async_trait]
pub trait SortStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn sort(&self, ctx: &mut dyn RenderContext) -> Outcome<String>;
}

/// Strategy for `mode`.
pub fn strategy_for(mode: SortMode, timeouts: Timeouts, pauses: Pauses) -> Box<dyn SortStrategy> {
    match mode {
        SortMode::UrlParam => Box::new(UrlParamSort { timeouts, pauses }),
        SortMode::Dropdown => Box::new(DropdownSort { timeouts, pauses }),
        SortMode::Auto => Box::new(AutoSort {
            primary: UrlParamSort { timeouts, pauses },
            fallback: DropdownSort { timeouts, pauses },
        }),
    }
}

/// `url` with the lowest-price sort applied and tracking parameters removed.
///
/// An existing sort parameter is replaced in place; otherwise it is appended.
pub fn sorted_results_url(url: &str) -> Result<String, StageError> {
    let mut parsed = Url::parse(url).map_err(|e| StageError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !site::TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut replaced = false;
    for (k, v) in pairs.iter_mut() {
        if k == site::SORT_PARAM {
            if replaced {
                // Duplicate sort keys collapse into the first one.
                k.clear();
            } else {
                *v = site::SORT_LOWEST_FIRST.to_string();
                replaced = true;
            }
        }
    }
    pairs.retain(|(k, _)| !k.is_empty());
    if !replaced {
        pairs.push((
            site::SORT_PARAM.to_string(),
            site::SORT_LOWEST_FIRST.to_string(),
        ));
    }

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(parsed.to_string())
}

fn sort_confirmed(url: &str) -> bool {
    Url::parse(url)
        .map(|u| {
            u.query_pairs()
                .any(|(k, v)| k == site::SORT_PARAM && v == site::SORT_LOWEST_FIRST)
        })
        .unwrap_or(false)
}

/// Sort by navigating to the results URL with `_sop=15`.
#[derive(Debug, Clone, Copy)]
pub struct UrlParamSort {
    timeouts: Timeouts,
    pauses: Pauses,
}

#[async_trait]
impl SortStrategy for UrlParamSort {
    fn name(&self) -> &'static str {
        "url"
    }

    async fn sort(&self, ctx: &mut dyn RenderContext) -> Outcome<String> {
        let current = match ctx.get_url().await {
            Ok(url) => url,
            Err(e) => return Outcome::failed(StageError::browser(e)),
        };
        let target = match sorted_results_url(&current) {
            Ok(url) => url,
            Err(e) => return Outcome::failed(e),
        };

        tracing::info!("Sorting results by lowest price");
        tracing::debug!("Sorted URL: {target}");
        let landed = match ctx.navigate(&target, self.timeouts.navigation_ms).await {
            Ok(nav) => {
                tracing::debug!("Sorted results answered in {}ms", nav.load_time_ms);
                nav.final_url
            }
            Err(e) => {
                return Outcome::failed(StageError::Navigation {
                    url: target,
                    reason: format!("{e:#}"),
                })
            }
        };

        let mut issues = Vec::new();
        wait_soft(
            &*ctx,
            LoadState::NetworkIdle,
            self.timeouts.network_idle_ms,
            "sort",
            &mut issues,
        )
        .await;
        settle(self.pauses.after_sort).await;

        let final_url = ctx.get_url().await.unwrap_or(landed);
        if sort_confirmed(&final_url) {
            tracing::info!("Results sorted by lowest price");
        } else {
            tracing::warn!("Sort parameter may not have persisted: {final_url}");
            issues.push(SoftIssue::SortNotConfirmed {
                url: final_url.clone(),
            });
        }
        Outcome::from_parts(final_url, issues)
    }
}

/// Sort through the page's sort menu.
#[derive(Debug, Clone, Copy)]
pub struct DropdownSort {
    timeouts: Timeouts,
    pauses: Pauses,
}

#[async_trait]
impl SortStrategy for DropdownSort {
    fn name(&self) -> &'static str {
        "dropdown"
    }

    async fn sort(&self, ctx: &mut dyn RenderContext) -> Outcome<String> {
        let controls = css_candidates(site::SORT_CONTROL);
        let Some(control) = resolve_visible(&*ctx, &controls, self.timeouts.selector_ms).await else {
            return Outcome::failed(StageError::SortControlNotFound);
        };
        if let Err(e) = ctx.click(control).await {
            return Outcome::failed(StageError::browser(e));
        }

        let options = site::sort_lowest_options();
        let Some(option) = resolve_visible(&*ctx, &options, self.timeouts.selector_ms).await else {
            return Outcome::failed(StageError::SortOptionNotFound);
        };
        tracing::info!("Sorting results via menu option {option}");
        if let Err(e) = ctx.click(option).await {
            return Outcome::failed(StageError::browser(e));
        }

        let mut issues = Vec::new();
        wait_soft(
            &*ctx,
            LoadState::NetworkIdle,
            self.timeouts.network_idle_ms,
            "sort",
            &mut issues,
        )
        .await;
        settle(self.pauses.after_sort).await;

        match ctx.get_url().await {
            Ok(url) => Outcome::from_parts(url, issues),
            Err(e) => Outcome::Failure {
                error: StageError::browser(e),
                issues,
            },
        }
    }
}

/// URL rewrite, then the dropdown if that fails.
#[derive(Debug, Clone, Copy)]
pub struct AutoSort {
    primary: UrlParamSort,
    fallback: DropdownSort,
}

#[async_trait]
impl SortStrategy for AutoSort {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn sort(&self, ctx: &mut dyn RenderContext) -> Outcome<String> {
        match self.primary.sort(ctx).await {
            Outcome::Failure { error, issues } => {
                tracing::warn!(
                    "{} sort failed ({error}), trying {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                match self.fallback.sort(ctx).await {
                    Outcome::Success(url) => Outcome::from_parts(url, issues),
                    Outcome::Degraded { value, issues: more } => {
                        Outcome::from_parts(value, issues.into_iter().chain(more).collect())
                    }
                    Outcome::Failure { error, issues: more } => Outcome::Failure {
                        error,
                        issues: issues.into_iter().chain(more).collect(),
                    },
                }
            }
            done => done,
        }
    }
}
