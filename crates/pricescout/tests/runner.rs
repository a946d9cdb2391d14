mod common;

use std::sync::Arc;

use common::{cards, test_config, uk_site, FakeLauncher};
use pricescout::progress::{self, ProgressEventKind};
use pricescout::{ScrapeError, ScrapeQuery, ScrapeRunner, ScrapeState, Scraper};
use tokio::sync::Semaphore;

fn query() -> ScrapeQuery {
    ScrapeQuery::new("iphone 15 pro", "UK", true, None).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_second_submission_is_rejected_while_busy() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let launcher = FakeLauncher::gated(uk_site(&cards(2, "bargain-bin-uk")), gate.clone());
    let runner = ScrapeRunner::new(Scraper::new(Arc::new(launcher.clone()), test_config(dir.path())));

    let first = runner.submit(query()).unwrap();
    assert!(runner.is_busy());
    assert!(matches!(runner.submit(query()), Err(ScrapeError::Busy)));

    gate.add_permits(1);
    let report = first.await.unwrap();
    assert_eq!(report.terminal_state(), ScrapeState::Done);
    assert!(!runner.is_busy());
    assert_eq!(launcher.log().launches.len(), 1);

    gate.add_permits(1);
    let again = runner.run(query()).await.unwrap();
    assert!(again.is_success());
    assert_eq!(launcher.log().launches.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_scrape_frees_the_runner() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScrapeRunner::new(Scraper::new(
        Arc::new(FakeLauncher::failing()),
        test_config(dir.path()),
    ));

    let report = runner.run(query()).await.unwrap();
    assert_eq!(report.terminal_state(), ScrapeState::Failed);
    assert!(!runner.is_busy());
    assert!(runner.run(query()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _keep) = progress::channel();
    let launcher = FakeLauncher::new(uk_site(&cards(1, "bargain-bin-uk")));
    let runner = ScrapeRunner::new(
        Scraper::new(Arc::new(launcher), test_config(dir.path())).with_progress(tx),
    );
    let mut rx = runner.subscribe().unwrap();

    let report = runner.run(query()).await.unwrap();
    assert!(report.is_success());

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event.event);
    }
    assert!(matches!(
        last,
        Some(ProgressEventKind::StateChanged {
            state: ScrapeState::Done,
            ..
        })
    ));
}
