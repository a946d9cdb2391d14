//! Configuration loading and resolution.

use std::path::PathBuf;

use pricescout::{ScrapeConfig, SortMode};

/// Build the scrape configuration from command-line overrides.
///
/// Session directory order: explicit flag, `PRICESCOUT_SESSION_DIR`,
/// `./browser_data` if it exists, then `~/.pricescout/sessions`.
pub fn build_config(
    session_dir: Option<&str>,
    chromium: Option<&str>,
    sort: SortMode,
    store_scan_limit: Option<usize>,
) -> ScrapeConfig {
    let mut config = ScrapeConfig::from_env();
    config.sort_mode = sort;
    if let Some(path) = session_dir.filter(|p| !p.trim().is_empty()) {
        config.session_dir = PathBuf::from(path);
    }
    if let Some(path) = chromium {
        config.chromium_path = Some(PathBuf::from(path));
    }
    if let Some(limit) = store_scan_limit {
        config.store_scan_limit = limit;
    }
    config
}
