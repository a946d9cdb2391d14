//! Chromium-based renderer using chromiumoxide.

use super::{
    ContextOptions, LaunchOptions, Launcher, LoadState, NavigationResult, RenderContext, Renderer,
};
use crate::dom::{self, DomOp, DomReply};
use crate::locator::ElementQuery;
use crate::state::{OriginStorage, StorageState, StoredCookie};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetGeolocationOverrideParams, SetLocaleOverrideParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Poll interval for load-state checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet window with no new resources before the network counts as idle.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PRICESCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PRICESCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.pricescout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".pricescout/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricescout/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricescout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".pricescout/chromium/chrome-linux64/chrome"),
                home.join(".pricescout/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches Chromium processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(ChromiumRenderer::launch(options).await?))
    }
}

/// A running Chromium instance.
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch Chromium with the given options.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = match &options.executable {
            Some(path) => path.clone(),
            None => find_chromium()
                .context("Chromium not found. Set PRICESCOUT_CHROMIUM_PATH or install Chrome.")?,
        };

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in &options.args {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP connection until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("chromium handler event error: {e}");
                }
            }
        });

        tracing::info!(
            "Browser launched ({})",
            if options.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser,
            handler_task,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(options.user_agent.clone())
            .accept_language(options.locale.clone())
            .build()
            .map_err(|e| anyhow!("invalid user agent override: {e}"))?;
        page.execute(user_agent).await.context("failed to set user agent")?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(options.viewport.width),
            i64::from(options.viewport.height),
            1.0,
            false,
        ))
        .await
        .context("failed to set viewport")?;

        page.execute(SetLocaleOverrideParams::builder().locale(options.locale.clone()).build())
            .await
            .context("failed to set locale")?;

        page.execute(GrantPermissionsParams::new(vec![PermissionType::Geolocation]))
            .await
            .context("failed to grant geolocation")?;
        page.execute(
            SetGeolocationOverrideParams::builder()
                .latitude(options.geolocation.latitude)
                .longitude(options.geolocation.longitude)
                .accuracy(100.0)
                .build(),
        )
        .await
        .context("failed to set geolocation")?;

        if let Some(state) = &options.storage_state {
            if let Err(e) = seed_storage(&page, state).await {
                if let Err(close) = page.close().await {
                    tracing::debug!("Closing unseeded page failed: {close}");
                }
                return Err(e);
            }
        }

        Ok(Box::new(ChromiumContext { page }))
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        let mut browser = self.browser;
        let closed = browser.close().await;
        let _ = browser.wait().await;
        self.handler_task.abort();
        closed.context("failed to close browser")?;
        tracing::info!("Browser closed");
        Ok(())
    }
}

/// Load saved cookies and local storage into a fresh page.
async fn seed_storage(page: &Page, state: &StorageState) -> Result<()> {
    let cookies = state
        .cookies
        .iter()
        .filter_map(|c| {
            let mut builder = CookieParam::builder()
                .name(c.name.clone())
                .value(c.value.clone())
                .domain(c.domain.clone())
                .path(c.path.clone())
                .secure(c.secure)
                .http_only(c.http_only);
            if c.expires > 0.0 {
                builder = builder.expires(TimeSinceEpoch::new(c.expires));
            }
            builder.build().ok()
        })
        .collect::<Vec<_>>();
    if !cookies.is_empty() {
        // Cookies carry their own domain; the blank page's URL does not matter.
        page.execute(SetCookiesParams::new(cookies))
            .await
            .context("failed to restore cookies")?;
    }

    for origin in &state.origins {
        let entries: Vec<(String, String)> = origin
            .local_storage
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect();
        let script = dom::seed_local_storage_script(&origin.origin, &entries);
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .context("failed to restore local storage")?;
    }

    tracing::debug!(
        "Seeded context with {} cookies, {} origins",
        state.cookies.len(),
        state.origins.len()
    );
    Ok(())
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
}

impl ChromiumContext {
    async fn dom(&self, query: &ElementQuery, op: DomOp<'_>) -> Result<DomReply> {
        let value = self
            .execute_js(&dom::build_element_script(query, op))
            .await
            .with_context(|| format!("element script failed for {query}"))?;
        serde_json::from_value(value).map_err(|e| anyhow!("unexpected element reply: {e}"))
    }

    async fn act(&self, query: &ElementQuery, op: DomOp<'_>) -> Result<()> {
        let reply = self.dom(query, op).await?;
        if !reply.found {
            bail!("no element matches {query}");
        }
        Ok(())
    }

    async fn ready_state(&self) -> Result<(String, u64)> {
        let value = self.execute_js(dom::ready_state_script()).await?;
        let state = value["readyState"].as_str().unwrap_or("loading").to_string();
        let resources = value["resources"].as_u64().unwrap_or(0);
        Ok((state, resources))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn go_back(&mut self, timeout_ms: u64) -> Result<()> {
        let before = self.get_url().await.unwrap_or_default();
        self.execute_js(dom::history_back_script()).await?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Ok(now) = self.get_url().await {
                if now != before {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                bail!("history navigation timed out after {timeout_ms}ms");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_load(&self, state: LoadState, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut last_resources = 0u64;
        let mut quiet_since = Instant::now();

        loop {
            // Scripts fail while a navigation swaps documents; treat as "not ready".
            if let Ok((ready, resources)) = self.ready_state().await {
                let reached = match state {
                    LoadState::DomContentLoaded => ready != "loading",
                    LoadState::NetworkIdle => {
                        if resources != last_resources {
                            last_resources = resources;
                            quiet_since = Instant::now();
                        }
                        ready == "complete" && quiet_since.elapsed() >= NETWORK_IDLE_WINDOW
                    }
                };
                if reached {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                bail!("timed out after {timeout_ms}ms waiting for {state}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        Ok(self.dom(query, DomOp::Count).await?.count)
    }

    async fn is_visible(&self, query: &ElementQuery) -> Result<bool> {
        let reply = self.dom(query, DomOp::Visible).await?;
        Ok(reply.found && reply.value.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, query: &ElementQuery) -> Result<()> {
        self.act(query, DomOp::Click).await
    }

    async fn fill(&mut self, query: &ElementQuery, text: &str) -> Result<()> {
        self.act(query, DomOp::Fill(text)).await
    }

    async fn press_enter(&mut self, query: &ElementQuery) -> Result<()> {
        self.act(query, DomOp::PressEnter).await
    }

    async fn attribute(&self, query: &ElementQuery, name: &str) -> Result<Option<String>> {
        Ok(self.dom(query, DomOp::Attribute(name)).await?.string_value())
    }

    async fn text_content(&self, query: &ElementQuery) -> Result<Option<String>> {
        Ok(self.dom(query, DomOp::Text).await?.string_value())
    }

    async fn inner_html(&self, query: &ElementQuery) -> Result<Option<String>> {
        Ok(self.dom(query, DomOp::InnerHtml).await?.string_value())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("failed to read cookies")?
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: c.expires,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let origin: OriginStorage =
            serde_json::from_value(self.execute_js(dom::local_storage_script()).await?)
                .map_err(|e| anyhow!("unexpected local storage reply: {e}"))?;
        let origins = if origin.origin.starts_with("http") && !origin.local_storage.is_empty() {
            vec![origin]
        } else {
            Vec::new()
        };

        Ok(StorageState { cookies, origins })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
