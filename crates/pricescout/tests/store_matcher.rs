mod common;

use common::{cards, open_context, test_config, uk_site, Card, FakeLauncher, UK, UK_RESULTS};
use pricescout::region;
use pricescout::stages::extract::ListingExtractor;
use pricescout::stages::store::StoreMatcher;
use pricescout::{Outcome, SoftIssue};
use rust_decimal::Decimal;

/// Results with `n` cards where card `at` (1-based) is sold by UniqueSellingMart.
fn results_with_store_at(n: usize, at: usize) -> Vec<Card> {
    let mut all = cards(n, "bargain-bin-uk");
    all[at - 1].seller = "UniqueSellingMart".to_string();
    all[at - 1].price = "£749.99".to_string();
    all
}

/// Context sitting on a listing page opened from the results.
async fn on_detail_page(launcher: &FakeLauncher) -> (Box<dyn pricescout::renderer::Renderer>, Box<dyn pricescout::renderer::RenderContext>) {
    let (renderer, mut ctx) = open_context(launcher).await;
    ctx.navigate(&format!("{UK_RESULTS}?_nkw=iphone&_sop=15"), 1_000)
        .await
        .unwrap();
    ctx.navigate(&format!("{UK}/itm/1001"), 1_000).await.unwrap();
    (renderer, ctx)
}

#[tokio::test(start_paused = true)]
async fn test_store_found_at_position_37_of_50() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let listings = results_with_store_at(50, 37);
    let launcher = FakeLauncher::new(uk_site(&listings));
    let (_renderer, mut ctx) = on_detail_page(&launcher).await;

    let uk = region::resolve("UK");
    let extractor = ListingExtractor::new(&config, uk);
    let outcome = StoreMatcher::new(&config, &extractor)
        .find_store(ctx.as_mut(), "uniquesellingmart", UK_RESULTS)
        .await;

    let listing = match outcome {
        Outcome::Success(Some(listing)) => listing,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(listing.listing_id.as_deref(), Some("1037"));
    assert_eq!(listing.url, "https://www.ebay.co.uk/itm/1037");
    assert_eq!(listing.price.value, Decimal::new(74999, 2));
    assert_eq!(listing.title, "Apple iPhone 15 Pro 128GB - listing 37");
}

#[tokio::test(start_paused = true)]
async fn test_store_beyond_scan_limit_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let listings = results_with_store_at(51, 51);
    let launcher = FakeLauncher::new(uk_site(&listings));
    let (_renderer, mut ctx) = on_detail_page(&launcher).await;

    let extractor = ListingExtractor::new(&config, region::resolve("UK"));
    let outcome = StoreMatcher::new(&config, &extractor)
        .find_store(ctx.as_mut(), "UniqueSellingMart", UK_RESULTS)
        .await;

    assert!(matches!(outcome, Outcome::Success(None)), "got {outcome:?}");
    assert!(!launcher
        .log()
        .visited
        .iter()
        .any(|url| url.ends_with("/itm/1051")));
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_store_listing_is_absent_with_issue() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let listings = results_with_store_at(5, 3);
    let site = uk_site(&listings).route(
        &format!("{UK}/itm/1003"),
        "<html><body><div class=\"x-price-primary\"><span>Price on request</span></div></body></html>",
    );
    let launcher = FakeLauncher::new(site);
    let (_renderer, mut ctx) = on_detail_page(&launcher).await;

    let extractor = ListingExtractor::new(&config, region::resolve("UK"));
    let outcome = StoreMatcher::new(&config, &extractor)
        .find_store(ctx.as_mut(), "uniquesellingmart", UK_RESULTS)
        .await;

    match outcome {
        Outcome::Degraded { value, issues } => {
            assert!(value.is_none());
            assert!(matches!(
                issues.as_slice(),
                [SoftIssue::StoreListingUnreadable { position: 3, .. }]
            ));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reopens_results_when_history_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let listings = results_with_store_at(4, 2);
    let launcher = FakeLauncher::new(uk_site(&listings));
    let (_renderer, mut ctx) = open_context(&launcher).await;
    ctx.navigate(&format!("{UK}/itm/1001"), 1_000).await.unwrap();

    let extractor = ListingExtractor::new(&config, region::resolve("UK"));
    let outcome = StoreMatcher::new(&config, &extractor)
        .find_store(ctx.as_mut(), "uniquesellingmart", UK_RESULTS)
        .await;

    assert!(matches!(outcome, Outcome::Success(Some(_))));
    assert!(launcher.log().visited.iter().any(|u| u == UK_RESULTS));
}
