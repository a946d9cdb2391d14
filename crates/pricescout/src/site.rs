//! Selector tables for the storefront markup.
//!
//! Every list is ordered most specific first. The storefront ships two card
//! layouts (`s-card` and the older `s-item`), so most tables carry one
//! entry for each.

use crate::locator::{ElementQuery, Locator};

pub const CONSENT_ACCEPT: &[&str] = &[
    "button#gdpr-banner-accept",
    "button[id*=\"accept\"]",
    "button[class*=\"gdpr-banner-accept\"]",
    "#gdpr-banner-accept",
];

pub const SEARCH_INPUT: &[&str] = &[
    "input[type=\"text\"][placeholder*=\"Search\"]",
    "input[name=\"_nkw\"]",
    "input#gh-ac",
    "input[placeholder=\"Search for anything\"]",
];

pub const SEARCH_SUBMIT: &[&str] = &[
    "input[type=\"submit\"][value=\"Search\"]",
    "button[type=\"submit\"]",
    "input#gh-btn",
    "input.btn-prim",
];

/// Any of these visible means the search matched nothing.
pub fn no_results_sentinels() -> Vec<ElementQuery> {
    vec![
        ElementQuery::text("No exact matches found"),
        ElementQuery::text("0 results"),
        ElementQuery::css(".srp-save-null-search"),
        ElementQuery::text("No results found"),
    ]
}

/// Result cards, waited on after a search.
pub const RESULT_CARDS: &str = "li.s-card, .s-item";

/// Result cards scanned for a store name.
pub const STORE_CARDS: &str = "li.s-card, li.s-item";

/// The first result, found through its item-index marker.
pub const FIRST_CARD: &[&str] = &["li[data-view$=\"iid:1\"]", "li[data-view*=\"iid:1\"]"];

/// Listing link inside a card.
pub const CARD_LINK: &[&str] = &["a.s-card__link[href*=\"/itm/\"]", "a.s-item__link"];

/// Title text inside a card link.
pub const LINK_TITLE: &str = ".su-styled-text, .s-card__title, .s-item__title";

pub const LISTING_ID_ATTR: &str = "data-listingid";

/// Price on a listing detail page.
pub const DETAIL_PRICE: &[&str] = &[
    ".x-bin-price__content .x-price-primary span.ux-textspans",
    ".x-price-primary span.ux-textspans",
    ".x-price-primary span",
    "#prcIsum",
];

/// Sort value for "price + shipping: lowest first".
pub const SORT_PARAM: &str = "_sop";
pub const SORT_LOWEST_FIRST: &str = "15";

/// Query parameters dropped when rewriting the results URL.
pub const TRACKING_PARAMS: &[&str] = &["_trksid", "_trkparms"];

pub const SORT_CONTROL: &[&str] = &[
    "button[aria-label*=\"Sort\"]",
    ".srp-controls__sort button",
];

/// "Lowest price first" entries of the sort menu.
pub fn sort_lowest_options() -> Vec<ElementQuery> {
    vec![
        ElementQuery::css("a[href*=\"_sop=15\"]"),
        ElementQuery::new(Locator::text("Price + Shipping: lowest first")),
        ElementQuery::new(Locator::text("Price + postage: lowest first")),
        ElementQuery::new(Locator::text("Lowest price + P&P")),
    ]
}
