//! In-memory browser that serves static HTML, for driving the pipeline in tests.
//!
//! Pages are plain HTML strings keyed by URL. Element queries are evaluated
//! with `scraper`. Navigation follows a few conventions:
//! - clicking an element with `href` or `data-nav` opens that URL
//! - pressing Enter in an element with `data-submit` opens that URL
//! - an element is hidden when it or an ancestor has `hidden` or `display:none`

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Semaphore;
use url::Url;

use pricescout::config::{Pauses, ScrapeConfig};
use pricescout::locator::{ElementQuery, Locator};
use pricescout::renderer::{
    ContextOptions, GeoPoint, LaunchOptions, Launcher, LoadState, NavigationResult,
    RenderContext, Renderer, Viewport,
};
use pricescout::state::{StorageState, StoredCookie};

pub const UK: &str = "https://www.ebay.co.uk";
pub const UK_RESULTS: &str = "https://www.ebay.co.uk/sch/i.html";

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// URL → HTML routes plus failure switches.
#[derive(Clone, Default)]
pub struct FakeSite {
    routes: HashMap<String, String>,
    failing: Vec<String>,
    redirects: Vec<(String, String)>,
    slow_loads: bool,
    fail_seeding: bool,
    failing_counts: usize,
    cookies: Vec<StoredCookie>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, html: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), html.into());
        self
    }

    /// Navigations to URLs containing `pattern` fail.
    pub fn fail_navigation(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    /// Every load-state wait times out.
    pub fn slow_loads(mut self) -> Self {
        self.slow_loads = true;
        self
    }

    /// Navigations to URLs containing `pattern` land on `to` instead.
    pub fn redirect(mut self, pattern: &str, to: &str) -> Self {
        self.redirects.push((pattern.to_string(), to.to_string()));
        self
    }

    /// Contexts cannot be opened with saved state.
    pub fn fail_seeding(mut self) -> Self {
        self.fail_seeding = true;
        self
    }

    /// The first `n` element counts in each context fail.
    pub fn failing_counts(mut self, n: usize) -> Self {
        self.failing_counts = n;
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".ebay.co.uk".to_string(),
            path: "/".to_string(),
            expires: 1_900_000_000.0,
            http_only: false,
            secure: true,
        });
        self
    }

    /// Exact URL first, then the URL without query and fragment.
    fn lookup(&self, url: &str) -> Option<&String> {
        self.routes.get(url).or_else(|| {
            let bare = url.split(['?', '#']).next().unwrap_or(url);
            self.routes.get(bare)
        })
    }
}

// ---------------------------------------------------------------------------
// Browser log
// ---------------------------------------------------------------------------

/// What the fake browser was asked to do.
#[derive(Default)]
pub struct BrowserLog {
    pub launches: Vec<LaunchOptions>,
    pub contexts: Vec<ContextOptions>,
    pub visited: Vec<String>,
    pub visibility_checks: Vec<String>,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub enters: Vec<String>,
    pub scripts: Vec<String>,
    pub contexts_closed: usize,
    pub shutdowns: usize,
}

type SharedLog = Arc<Mutex<BrowserLog>>;

fn record<T>(log: &SharedLog, f: impl FnOnce(&mut BrowserLog) -> T) -> T {
    let mut guard = log.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

// ---------------------------------------------------------------------------
// Launcher / renderer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FakeLauncher {
    site: Arc<FakeSite>,
    log: SharedLog,
    fail_launch: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            log: SharedLog::default(),
            fail_launch: false,
            gate: None,
        }
    }

    /// A launcher whose browser never starts.
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(FakeSite::new())
        }
    }

    /// Each launch waits for one permit from `gate`.
    pub fn gated(site: FakeSite, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(site)
        }
    }

    pub fn log(&self) -> MutexGuard<'_, BrowserLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Renderer>> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|e| anyhow!("{e}"))?.forget();
        }
        record(&self.log, |l| l.launches.push(options.clone()));
        if self.fail_launch {
            bail!("Chromium not found");
        }
        Ok(Box::new(FakeRenderer {
            site: self.site.clone(),
            log: self.log.clone(),
        }))
    }
}

struct FakeRenderer {
    site: Arc<FakeSite>,
    log: SharedLog,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        record(&self.log, |l| l.contexts.push(options.clone()));
        if self.site.fail_seeding && options.storage_state.is_some() {
            bail!("failed to restore cookies: Blank page can not have cookie");
        }
        Ok(Box::new(FakeContext {
            site: self.site.clone(),
            log: self.log.clone(),
            current: "about:blank".to_string(),
            html: String::new(),
            history: Vec::new(),
            failed_counts: AtomicUsize::new(0),
        }))
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        record(&self.log, |l| l.shutdowns += 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

pub struct FakeContext {
    site: Arc<FakeSite>,
    log: SharedLog,
    current: String,
    html: String,
    history: Vec<String>,
    failed_counts: AtomicUsize,
}

impl FakeContext {
    fn load(&mut self, url: &str) -> Result<()> {
        if self.site.failing.iter().any(|p| url.contains(p.as_str())) {
            bail!("net::ERR_CONNECTION_RESET at {url}");
        }
        let url = self
            .site
            .redirects
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, to)| to.as_str())
            .unwrap_or(url);
        let html = self
            .site
            .lookup(url)
            .ok_or_else(|| anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}"))?
            .clone();
        self.current = url.to_string();
        self.html = html;
        record(&self.log, |l| l.visited.push(url.to_string()));
        Ok(())
    }

    fn resolve_url(&self, target: &str) -> String {
        Url::parse(&self.current)
            .and_then(|base| base.join(target))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| target.to_string())
    }

    /// Run `f` on the selected element of the current page.
    fn with_element<T>(
        &self,
        query: &ElementQuery,
        f: impl FnOnce(Option<ElementRef<'_>>, usize) -> T,
    ) -> Result<T> {
        let doc = Html::parse_document(&self.html);
        let (matches, nth) = select(&doc, query)?;
        let count = matches.len();
        Ok(f(matches.get(nth).copied(), count))
    }

    fn required<T>(
        &self,
        query: &ElementQuery,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T> {
        self.with_element(query, |el, _| el.map(f))?
            .ok_or_else(|| anyhow!("no element matches {query}"))
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

fn find_all<'a>(root: ElementRef<'a>, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
    match locator {
        Locator::Css(css) => {
            let selector =
                Selector::parse(css).map_err(|e| anyhow!("invalid selector {css}: {e:?}"))?;
            Ok(root.select(&selector).collect())
        }
        Locator::Text(text) => Ok(root
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| element_text(*el) == *text)
            .filter(|el| {
                !el.children()
                    .filter_map(ElementRef::wrap)
                    .any(|c| element_text(c) == *text)
            })
            .collect()),
    }
}

/// Matches of the query's last step and the index to pick among them.
fn select<'a>(doc: &'a Html, query: &ElementQuery) -> Result<(Vec<ElementRef<'a>>, usize)> {
    let steps = query.steps();
    let Some((last, parents)) = steps.split_last() else {
        bail!("empty query");
    };
    let mut root = doc.root_element();
    for step in parents {
        match find_all(root, &step.locator)?.get(step.nth) {
            Some(el) => root = *el,
            None => return Ok((Vec::new(), last.nth)),
        }
    }
    Ok((find_all(root, &last.locator)?, last.nth))
}

fn is_shown(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|e| {
            let v = e.value();
            let style = v.attr("style").unwrap_or("").replace(' ', "");
            v.attr("hidden").is_none() && !style.contains("display:none")
        })
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let previous = self.current.clone();
        self.load(url)?;
        if previous != "about:blank" {
            self.history.push(previous);
        }
        Ok(NavigationResult {
            final_url: self.current.clone(),
            load_time_ms: 5,
        })
    }

    async fn go_back(&mut self, _timeout_ms: u64) -> Result<()> {
        let previous = self
            .history
            .pop()
            .ok_or_else(|| anyhow!("no history entry to go back to"))?;
        self.load(&previous)
    }

    async fn wait_for_load(&self, state: LoadState, timeout_ms: u64) -> Result<()> {
        if self.site.slow_loads {
            bail!("timed out after {timeout_ms}ms waiting for {state}");
        }
        Ok(())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        record(&self.log, |l| l.scripts.push(script.to_string()));
        Ok(serde_json::json!({ "success": true }))
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.current.clone())
    }

    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        if self.failed_counts.fetch_add(1, Ordering::SeqCst) < self.site.failing_counts {
            bail!("Execution context was destroyed");
        }
        self.with_element(query, |_, count| count)
    }

    async fn is_visible(&self, query: &ElementQuery) -> Result<bool> {
        record(&self.log, |l| l.visibility_checks.push(query.to_string()));
        self.with_element(query, |el, _| el.is_some_and(is_shown))
    }

    async fn click(&mut self, query: &ElementQuery) -> Result<()> {
        let target = self.required(query, |el| {
            let v = el.value();
            v.attr("href").or_else(|| v.attr("data-nav")).map(String::from)
        })?;
        record(&self.log, |l| l.clicks.push(query.to_string()));
        if let Some(target) = target {
            let url = self.resolve_url(&target);
            self.navigate(&url, 0).await?;
        }
        Ok(())
    }

    async fn fill(&mut self, query: &ElementQuery, text: &str) -> Result<()> {
        self.required(query, |_| ())?;
        record(&self.log, |l| l.fills.push((query.to_string(), text.to_string())));
        Ok(())
    }

    async fn press_enter(&mut self, query: &ElementQuery) -> Result<()> {
        let target = self.required(query, |el| el.value().attr("data-submit").map(String::from))?;
        record(&self.log, |l| l.enters.push(query.to_string()));
        if let Some(target) = target {
            let url = self.resolve_url(&target);
            self.navigate(&url, 0).await?;
        }
        Ok(())
    }

    async fn attribute(&self, query: &ElementQuery, name: &str) -> Result<Option<String>> {
        self.with_element(query, |el, _| {
            el.and_then(|e| e.value().attr(name).map(String::from))
        })
    }

    async fn text_content(&self, query: &ElementQuery) -> Result<Option<String>> {
        self.with_element(query, |el, _| el.map(|e| e.text().collect::<String>()))
    }

    async fn inner_html(&self, query: &ElementQuery) -> Result<Option<String>> {
        self.with_element(query, |el, _| el.map(|e| e.inner_html()))
    }

    async fn storage_state(&self) -> Result<StorageState> {
        Ok(StorageState {
            cookies: self.site.cookies.clone(),
            origins: Vec::new(),
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        record(&self.log, |l| l.contexts_closed += 1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn context_options() -> ContextOptions {
    ContextOptions {
        viewport: Viewport {
            width: 1280,
            height: 720,
        },
        locale: "en-GB".to_string(),
        geolocation: GeoPoint {
            latitude: 51.5074,
            longitude: -0.1278,
        },
        user_agent: "test".to_string(),
        storage_state: None,
    }
}

/// A fresh context on `launcher`'s site, plus the renderer that owns it.
pub async fn open_context(launcher: &FakeLauncher) -> (Box<dyn Renderer>, Box<dyn RenderContext>) {
    let renderer = launcher
        .launch(&LaunchOptions {
            headless: true,
            args: Vec::new(),
            executable: None,
        })
        .await
        .unwrap();
    let ctx = renderer.new_context(&context_options()).await.unwrap();
    (renderer, ctx)
}

/// Config with no settle pauses and sessions kept under `dir`.
pub fn test_config(dir: &Path) -> ScrapeConfig {
    ScrapeConfig {
        pauses: Pauses::none(),
        session_dir: dir.to_path_buf(),
        ..ScrapeConfig::default()
    }
}

/// One result card.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: u64,
    pub title: String,
    pub seller: String,
    pub price: String,
}

impl Card {
    pub fn new(id: u64, title: &str, seller: &str, price: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            seller: seller.to_string(),
            price: price.to_string(),
        }
    }
}

/// `n` cards numbered from 1001, all from `seller`.
pub fn cards(n: usize, seller: &str) -> Vec<Card> {
    (1..=n)
        .map(|i| {
            Card::new(
                1000 + i as u64,
                &format!("Apple iPhone 15 Pro 128GB - listing {i}"),
                seller,
                &format!("£{}.00", 700 + i),
            )
        })
        .collect()
}

pub fn home_page(with_submit_button: bool, with_consent: bool) -> String {
    let consent = if with_consent {
        r#"<div id="gdpr-banner"><button id="gdpr-banner-accept">Accept all</button></div>"#
    } else {
        ""
    };
    let submit = if with_submit_button {
        r#"<input type="submit" id="gh-btn" value="Search" data-nav="/sch/i.html?_nkw=iphone+15+pro&_trksid=p2380057.m570.l1313">"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
        {consent}
        <form id="gh-f">
          <input type="text" id="gh-ac" name="_nkw" placeholder="Search for anything"
                 data-submit="/sch/i.html?_nkw=iphone+15+pro&_trksid=p2380057.m570.l1312">
          {submit}
        </form>
        </body></html>"#
    )
}

pub fn results_page(cards: &[Card]) -> String {
    let items: String = cards
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                r#"<li class="s-item" data-view="mi:1686|iid:{iid}" data-listingid="{id}">
                  <a class="s-item__link" href="https://www.ebay.co.uk/itm/{id}?hash=item{id}">
                    <span class="s-item__title">{title}</span>
                  </a>
                  <span class="s-item__price">{price}</span>
                  <span class="s-item__seller-info-text">{seller} (1,204) 99.6%</span>
                </li>"#,
                iid = i + 1,
                id = c.id,
                title = c.title,
                price = c.price,
                seller = c.seller,
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="srp-controls__sort"><button aria-label="Sort selector. Best Match selected.">Sort: Best Match</button></div>
        <ul class="srp-results">{items}</ul>
        </body></html>"#
    )
}

pub fn no_results_page() -> String {
    r#"<html><body>
    <div class="srp-save-null-search">
      <h3 class="srp-save-null-search__heading">No exact matches found</h3>
    </div>
    </body></html>"#
        .to_string()
}

pub fn detail_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="x-item-title__mainTitle"><span class="ux-textspans ux-textspans--BOLD">{title}</span></h1>
        <div class="x-price-primary"><span class="ux-textspans">{price}</span></div>
        </body></html>"#
    )
}

/// UK storefront with the given results and a detail page per card.
pub fn uk_site(cards: &[Card]) -> FakeSite {
    let mut site = FakeSite::new()
        .route(UK, home_page(true, true))
        .route(UK_RESULTS, results_page(cards));
    for c in cards {
        site = site.route(
            &format!("{UK}/itm/{}", c.id),
            detail_page(&c.title, &c.price),
        );
    }
    site
}
