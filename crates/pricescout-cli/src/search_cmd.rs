//! `pricescout search <term>`: run one scrape and print the report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use pricescout::progress::{self, ProgressEventKind, ProgressReceiver};
use pricescout::renderer::chromium::ChromiumLauncher;
use pricescout::{ScrapeConfig, ScrapeQuery, ScrapeReport, ScrapeRunner, Scraper};

use crate::render;

/// Options for one search.
pub struct SearchArgs {
    pub term: String,
    pub region: String,
    pub store: Option<String>,
    pub headless: bool,
    pub json: bool,
    pub quiet: bool,
}

/// Run the search command. Returns whether the scrape succeeded.
pub async fn run(args: SearchArgs, config: ScrapeConfig) -> Result<bool> {
    let query = ScrapeQuery::new(&args.term, &args.region, args.headless, args.store.as_deref())?;
    tracing::debug!(
        "Sessions in {}, sort mode {}",
        config.session_dir.display(),
        config.sort_mode
    );

    let (tx, rx) = progress::channel();
    let scraper = Scraper::new(Arc::new(ChromiumLauncher), config).with_progress(tx);
    let runner = ScrapeRunner::new(scraper);

    let spinner = if args.json || args.quiet {
        ProgressBar::hidden()
    } else {
        new_spinner(&format!("Searching for '{}'...", query.search_term))
    };
    let follower = tokio::spawn(follow_progress(rx, spinner.clone()));

    let report = runner.run(query).await;
    // The channel closes once the scraper is gone; buffered warnings still print.
    drop(runner);
    if let Err(e) = follower.await {
        tracing::debug!("Progress display ended early: {e}");
    }
    spinner.finish_and_clear();
    let report = report?;

    print_report(&report, &args)?;
    Ok(report.is_success())
}

fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Mirror progress events onto the spinner until the channel closes.
///
/// Returns how many warnings were shown.
async fn follow_progress(mut rx: ProgressReceiver, spinner: ProgressBar) -> usize {
    use tokio::sync::broadcast::error::RecvError;

    let mut warnings = 0;
    loop {
        match rx.recv().await {
            Ok(event) => match &event.event {
                ProgressEventKind::StateChanged { message, .. } => {
                    spinner.set_message(message.clone());
                }
                ProgressEventKind::Warning { message } => {
                    spinner.println(format!("warning: {message}"));
                    warnings += 1;
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress display skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
    warnings
}

fn print_report(report: &ScrapeReport, args: &SearchArgs) -> Result<()> {
    if args.json {
        println!("{}", render::render_json(report, &args.term)?);
    } else {
        print!("{}", render::render_text(report, &args.term));
        if args.quiet && !report.issues.is_empty() {
            eprint!("{}", render::render_issues(&report.issues));
        }
    }
    Ok(())
}
