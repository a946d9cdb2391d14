//! Cookie consent interstitial.

use std::time::Duration;

use crate::locator::css_candidates;
use crate::renderer::RenderContext;
use crate::selector::resolve_visible;
use crate::site;

/// Best-effort dismissal of the consent banner. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct ConsentHandler {
    timeout_each_ms: u64,
    pause: Duration,
}

impl ConsentHandler {
    pub fn new(timeout_each_ms: u64, pause: Duration) -> Self {
        Self {
            timeout_each_ms,
            pause,
        }
    }

    /// Click the accept button if one shows up. Returns whether it was clicked.
    pub async fn attempt(&self, ctx: &mut dyn RenderContext) -> bool {
        let candidates = css_candidates(site::CONSENT_ACCEPT);
        let Some(button) = resolve_visible(&*ctx, &candidates, self.timeout_each_ms).await else {
            tracing::debug!("No consent banner");
            return false;
        };

        tracing::info!("Accepting cookie consent");
        if let Err(e) = ctx.click(button).await {
            tracing::debug!("Consent click failed: {e:#}");
            return false;
        }
        super::settle(self.pause).await;
        true
    }
}
