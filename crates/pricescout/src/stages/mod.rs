//! Pipeline stages.
//!
//! Each stage drives one [`RenderContext`] and reports an [`Outcome`];
//! none of them decide whether the scrape as a whole goes on.
//!
//! [`Outcome`]: crate::outcome::Outcome

pub mod consent;
pub mod extract;
pub mod search;
pub mod sort;
pub mod store;

use std::time::Duration;

use crate::outcome::SoftIssue;
use crate::renderer::{LoadState, RenderContext};

/// Sleep for a settle pause; zero skips the sleep.
pub(crate) async fn settle(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

/// Wait for a load state, turning a timeout into a [`SoftIssue::SlowLoad`].
pub(crate) async fn wait_soft(
    ctx: &dyn RenderContext,
    state: LoadState,
    timeout_ms: u64,
    during: &str,
    issues: &mut Vec<SoftIssue>,
) {
    if let Err(e) = ctx.wait_for_load(state, timeout_ms).await {
        tracing::warn!("Page still loading during {during}, continuing: {e:#}");
        issues.push(SoftIssue::SlowLoad {
            during: during.to_string(),
            waited_ms: timeout_ms,
        });
    }
}
