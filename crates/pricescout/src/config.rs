//! Scrape configuration: timeouts, settle pauses and browser options.
//!
//! Defaults reproduce the timings the pipeline was tuned with against the
//! live storefronts. Paths can be overridden through the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::price::{CurrencySymbol, PriceNormalizer};
use crate::region::RegionProfile;
use crate::renderer::Viewport;

/// Env var naming the directory for saved sessions.
pub const SESSION_DIR_ENV: &str = "PRICESCOUT_SESSION_DIR";

/// Desktop Chrome user agent presented to the storefront.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upper bound on result cards inspected when looking for a store.
pub const DEFAULT_STORE_SCAN_LIMIT: usize = 50;

/// Bounds on every wait the pipeline performs, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub dom_ready_ms: u64,
    pub network_idle_ms: u64,
    /// Per-candidate visibility wait for inputs, links and prices.
    pub selector_ms: u64,
    /// Per-candidate wait for the consent button and the search submit control.
    pub optional_selector_ms: u64,
    /// Per-candidate wait for "no results" sentinels.
    pub sentinel_ms: u64,
    /// Wait for the first result card.
    pub results_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            dom_ready_ms: 10_000,
            network_idle_ms: 15_000,
            selector_ms: 3_000,
            optional_selector_ms: 2_000,
            sentinel_ms: 1_000,
            results_ms: 10_000,
        }
    }
}

/// Fixed settle pauses after page transitions.
///
/// The storefront renders parts of each page after its load events fire;
/// these give those parts time to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pauses {
    pub after_home: Duration,
    pub after_consent: Duration,
    pub after_fill: Duration,
    pub after_results: Duration,
    pub after_sort: Duration,
    pub after_detail: Duration,
    pub after_back: Duration,
}

impl Default for Pauses {
    fn default() -> Self {
        Self {
            after_home: Duration::from_secs(2),
            after_consent: Duration::from_secs(1),
            after_fill: Duration::from_secs(1),
            after_results: Duration::from_secs(3),
            after_sort: Duration::from_secs(2),
            after_detail: Duration::from_secs(3),
            after_back: Duration::from_secs(2),
        }
    }
}

impl Pauses {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            after_home: Duration::ZERO,
            after_consent: Duration::ZERO,
            after_fill: Duration::ZERO,
            after_results: Duration::ZERO,
            after_sort: Duration::ZERO,
            after_detail: Duration::ZERO,
            after_back: Duration::ZERO,
        }
    }
}

/// How results are reordered by price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Rewrite the results URL with the sort parameter.
    #[default]
    UrlParam,
    /// Drive the page's sort dropdown.
    Dropdown,
    /// URL rewrite first, dropdown when that fails.
    Auto,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "url" | "url-param" | "urlparam" => Ok(Self::UrlParam),
            "dropdown" => Ok(Self::Dropdown),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown sort mode '{other}' (expected url, dropdown or auto)"
            )),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UrlParam => write!(f, "url"),
            Self::Dropdown => write!(f, "dropdown"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Currency assumed for price text without a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyFallback {
    /// Always `$`.
    #[default]
    Dollar,
    /// The storefront region's currency.
    Region,
}

/// Everything a scrape needs besides the query itself.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub timeouts: Timeouts,
    pub pauses: Pauses,
    pub store_scan_limit: usize,
    pub sort_mode: SortMode,
    pub currency_fallback: CurrencyFallback,
    pub viewport: Viewport,
    pub user_agent: String,
    pub browser_args: Vec<String>,
    /// Explicit browser binary; discovered when `None`.
    pub chromium_path: Option<PathBuf>,
    pub session_dir: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            pauses: Pauses::default(),
            store_scan_limit: DEFAULT_STORE_SCAN_LIMIT,
            sort_mode: SortMode::default(),
            currency_fallback: CurrencyFallback::default(),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_args: vec!["--start-maximized".to_string()],
            chromium_path: None,
            session_dir: default_session_dir(),
        }
    }
}

impl ScrapeConfig {
    /// Defaults, with the session directory taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(SESSION_DIR_ENV).filter(|d| !d.is_empty()) {
            config.session_dir = PathBuf::from(dir);
        }
        config
    }

    /// Price parser for listings on `region`'s storefront.
    pub fn normalizer_for(&self, region: &RegionProfile) -> PriceNormalizer {
        match self.currency_fallback {
            CurrencyFallback::Dollar => PriceNormalizer::with_fallback(CurrencySymbol::Dollar),
            CurrencyFallback::Region => PriceNormalizer::with_fallback(region.default_currency),
        }
    }
}

/// `./browser_data` when it exists, otherwise `~/.pricescout/sessions`.
pub fn default_session_dir() -> PathBuf {
    let local = PathBuf::from("browser_data");
    if local.is_dir() {
        return local;
    }
    dirs::home_dir()
        .map(|home| home.join(".pricescout").join("sessions"))
        .unwrap_or(local)
}
