//! Ordered selector fallback.
//!
//! Candidates are tried strictly in order and the first one that passes its
//! check wins. There is no scoring and no backtracking; later candidates are
//! never touched once an earlier one succeeds.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::locator::ElementQuery;
use crate::renderer::RenderContext;

/// Delay between visibility checks while waiting on one candidate.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `attempt` on each candidate in order; return the first candidate whose
/// attempt yields a value, together with that value.
pub async fn first_match<'a, C, T, F, Fut>(candidates: &'a [C], mut attempt: F) -> Option<(&'a C, T)>
where
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for candidate in candidates {
        if let Some(value) = attempt(candidate).await {
            return Some((candidate, value));
        }
    }
    None
}

/// Poll until `query` is visible or `timeout_ms` elapses.
///
/// Errors from the page count as "not visible".
pub async fn wait_visible(ctx: &dyn RenderContext, query: &ElementQuery, timeout_ms: u64) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match ctx.is_visible(query).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => tracing::debug!("visibility check for {query} failed: {e:#}"),
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// First candidate that becomes visible within `timeout_each_ms`.
pub async fn resolve_visible<'a>(
    ctx: &dyn RenderContext,
    candidates: &'a [ElementQuery],
    timeout_each_ms: u64,
) -> Option<&'a ElementQuery> {
    let found = first_match(candidates, |q| async move {
        wait_visible(ctx, q, timeout_each_ms).await.then_some(())
    })
    .await
    .map(|(q, ())| q);

    match found {
        Some(q) => tracing::debug!("resolved {q}"),
        None => tracing::debug!("no visible candidate among {} selectors", candidates.len()),
    }
    found
}

/// First candidate present in the document right now, visible or not.
pub async fn resolve_present<'a>(
    ctx: &dyn RenderContext,
    candidates: &'a [ElementQuery],
) -> Option<&'a ElementQuery> {
    first_match(candidates, |q| async move {
        match ctx.count(q).await {
            Ok(n) if n > q.steps().last().map_or(0, |s| s.nth) => Some(()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("count for {q} failed: {e:#}");
                None
            }
        }
    })
    .await
    .map(|(q, ())| q)
}

/// Poll until `query` matches at least one element or `timeout_ms` elapses.
///
/// Failed counts (the document is often mid-swap) are retried until the
/// deadline. Returns the last count seen, or the last error when no count
/// ever succeeded.
pub async fn wait_for_count(
    ctx: &dyn RenderContext,
    query: &ElementQuery,
    timeout_ms: u64,
) -> anyhow::Result<usize> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut last: anyhow::Result<usize> = Ok(0);
    let mut counted = false;
    loop {
        match ctx.count(query).await {
            Ok(count) => {
                if count > 0 {
                    return Ok(count);
                }
                counted = true;
                last = Ok(count);
            }
            Err(e) => {
                tracing::debug!("count for {query} failed: {e:#}");
                if !counted {
                    last = Err(e);
                }
            }
        }
        if Instant::now() >= deadline {
            return last;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
