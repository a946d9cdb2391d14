//! Browser session lifecycle.
//!
//! A session is one browser process with one context, configured for a
//! storefront region and seeded with whatever state the last session for
//! that region left behind. Closing a session snapshots that state back to
//! disk and then always releases the browser.

use std::sync::Arc;

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::outcome::SoftIssue;
use crate::region::RegionProfile;
use crate::renderer::{ContextOptions, GeoPoint, LaunchOptions, Launcher, RenderContext, Renderer};
use crate::state::SessionStore;

/// A live browser and its single navigation context.
pub struct BrowserSession {
    region: &'static RegionProfile,
    renderer: Box<dyn Renderer>,
    context: Box<dyn RenderContext>,
}

impl BrowserSession {
    /// The browser context for this session.
    pub fn context_mut(&mut self) -> &mut dyn RenderContext {
        self.context.as_mut()
    }
}

/// Starts and closes browser sessions.
pub struct SessionManager {
    launcher: Arc<dyn Launcher>,
    store: SessionStore,
    config: Arc<ScrapeConfig>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn Launcher>, config: Arc<ScrapeConfig>) -> Self {
        Self {
            launcher,
            store: SessionStore::new(config.session_dir.clone()),
            config,
        }
    }

    /// Launch a browser and open a context for `region`.
    ///
    /// A saved session that cannot be read or restored is reported as a soft
    /// issue and the context starts fresh.
    pub async fn start(
        &self,
        region: &'static RegionProfile,
        headless: bool,
    ) -> Result<(BrowserSession, Vec<SoftIssue>), ScrapeError> {
        let mut issues = Vec::new();

        let storage_state = match self.store.load(region.code) {
            Ok(Some(state)) => {
                tracing::info!("Loading saved session for {}", region.code);
                Some(state)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not load saved session: {e}");
                issues.push(SoftIssue::SessionLoad {
                    reason: e.to_string(),
                });
                None
            }
        };

        let renderer = self
            .launcher
            .launch(&LaunchOptions {
                headless,
                args: self.config.browser_args.clone(),
                executable: self.config.chromium_path.clone(),
            })
            .await
            .map_err(|e| ScrapeError::Launch(format!("{e:#}")))?;

        let mut context_options = ContextOptions {
            viewport: self.config.viewport,
            locale: region.locale.to_string(),
            geolocation: GeoPoint {
                latitude: region.latitude,
                longitude: region.longitude,
            },
            user_agent: self.config.user_agent.clone(),
            storage_state,
        };
        let opened = match renderer.new_context(&context_options).await {
            Err(e) if context_options.storage_state.is_some() => {
                tracing::warn!("Could not restore saved session, starting fresh: {e:#}");
                issues.push(SoftIssue::SessionLoad {
                    reason: format!("{e:#}"),
                });
                context_options.storage_state = None;
                renderer.new_context(&context_options).await
            }
            opened => opened,
        };
        let context = match opened {
            Ok(context) => context,
            Err(e) => {
                if let Err(shutdown) = renderer.shutdown().await {
                    tracing::debug!("Shutdown after failed context: {shutdown:#}");
                }
                return Err(ScrapeError::Launch(format!("{e:#}")));
            }
        };

        tracing::info!("Browser launched (location: {})", region.code);
        Ok((
            BrowserSession {
                region,
                renderer,
                context,
            },
            issues,
        ))
    }

    /// Persist the session's state, then shut the browser down.
    ///
    /// Never fails; persistence problems come back as soft issues.
    pub async fn close(&self, session: BrowserSession) -> Vec<SoftIssue> {
        let BrowserSession {
            region,
            renderer,
            context,
        } = session;
        let mut issues = Vec::new();

        match context.storage_state().await {
            Ok(state) => match self.store.save(region.code, &state) {
                Ok(path) => tracing::info!("Session saved to {}", path.display()),
                Err(e) => {
                    tracing::warn!("Could not save session: {e}");
                    issues.push(SoftIssue::SessionSave {
                        reason: e.to_string(),
                    });
                }
            },
            Err(e) => {
                tracing::warn!("Could not capture session state: {e:#}");
                issues.push(SoftIssue::SessionSave {
                    reason: format!("{e:#}"),
                });
            }
        }

        if let Err(e) = context.close().await {
            tracing::debug!("Context close failed: {e:#}");
        }
        if let Err(e) = renderer.shutdown().await {
            tracing::warn!("Browser shutdown failed: {e:#}");
        }
        issues
    }
}
