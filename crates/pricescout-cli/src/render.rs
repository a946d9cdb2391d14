//! Turning scrape reports into terminal output.

use std::fmt::Write;

use serde::Serialize;

use pricescout::region;
use pricescout::{
    Listing, PriceComparison, ScrapeReport, ScrapeResult, ScrapeState, SoftIssue,
};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "━".repeat(RULE_WIDTH)
}

/// Human-readable report for `search_term`.
pub fn render_text(report: &ScrapeReport, search_term: &str) -> String {
    match &report.result {
        Ok(result) => render_result(result),
        Err(e) => {
            let mut out = String::new();
            let _ = writeln!(out, "{}", rule());
            let _ = writeln!(out, "  SEARCH FAILED");
            let _ = writeln!(out, "{}\n", rule());
            let _ = writeln!(out, "{}", e.user_message());
            if !e.is_no_results() {
                let _ = writeln!(out, "Could not find product information for '{search_term}'.");
            }
            out
        }
    }
}

fn listing_block(out: &mut String, heading: &str, price_label: &str, listing: &Listing) {
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Product:\n{}\n", listing.title);
    let _ = writeln!(out, "{price_label}:\n{}\n", listing.price);
    let _ = writeln!(out, "URL:\n{}\n", listing.url);
}

fn render_result(result: &ScrapeResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "  PRICE COMPARISON RESULTS");
    let _ = writeln!(out, "{}\n", rule());

    listing_block(&mut out, "LOWEST PRICE ON EBAY", "Price", &result.lowest);

    if let Some(yours) = &result.your_store {
        let _ = writeln!(out, "{}", rule());
        listing_block(&mut out, "YOUR STORE'S LISTING", "Your Price", yours);

        if let Some(comparison) = result.comparison() {
            let symbol = result.lowest.price.currency;
            let _ = writeln!(out, "{}", rule());
            let line = match comparison {
                PriceComparison::MoreExpensive(diff) => {
                    format!("You are {symbol}{diff:.2} MORE expensive than the lowest price")
                }
                PriceComparison::Cheaper(diff) => {
                    format!("You are {symbol}{diff:.2} CHEAPER than the competition!")
                }
                PriceComparison::Match => "Your price matches the lowest price!".to_string(),
            };
            let _ = writeln!(out, "{line}");
        }
    }

    let _ = writeln!(out, "\n{}", rule());
    out
}

/// Soft issues as warning lines, one per issue.
pub fn render_issues(issues: &[SoftIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("warning: {issue}\n"))
        .collect()
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    detail: String,
    no_results: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    query: &'a str,
    state: ScrapeState,
    transitions: &'a [ScrapeState],
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ScrapeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<PriceComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
    issues: &'a [SoftIssue],
}

/// Machine-readable report.
pub fn render_json(report: &ScrapeReport, search_term: &str) -> serde_json::Result<String> {
    let (result, error) = match &report.result {
        Ok(result) => (Some(result), None),
        Err(e) => (
            None,
            Some(JsonError {
                message: e.user_message(),
                detail: e.to_string(),
                no_results: e.is_no_results(),
            }),
        ),
    };
    let json = JsonReport {
        query: search_term,
        state: report.terminal_state(),
        transitions: &report.transitions,
        result,
        comparison: result.and_then(ScrapeResult::comparison),
        error,
        issues: &report.issues,
    };
    serde_json::to_string_pretty(&json)
}

/// The storefront table for `pricescout regions`.
pub fn render_regions(json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(region::all());
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<28} {:<8} {:<10} {}",
        "CODE", "STOREFRONT", "LOCALE", "POSTCODE", "CURRENCY"
    );
    for profile in region::all() {
        let _ = writeln!(
            out,
            "{:<6} {:<28} {:<8} {:<10} {}",
            profile.code,
            profile.base_url,
            profile.locale,
            profile.postcode,
            profile.default_currency
        );
    }
    Ok(out)
}
