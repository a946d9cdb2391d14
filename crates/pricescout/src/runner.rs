//! Single-flight background execution of scrapes.
//!
//! A [`ScrapeRunner`] runs at most one scrape at a time on a tokio task and
//! hands back exactly one [`ScrapeReport`] per accepted submission. Progress
//! flows separately over the scraper's broadcast channel.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::error::ScrapeError;
use crate::orchestrator::{ScrapeReport, ScrapeState, Scraper};
use crate::progress::ProgressReceiver;
use crate::types::ScrapeQuery;

pub struct ScrapeRunner {
    scraper: Arc<Scraper>,
    gate: Arc<Mutex<()>>,
}

impl ScrapeRunner {
    pub fn new(scraper: Scraper) -> Self {
        Self {
            scraper: Arc::new(scraper),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Subscribe to progress events, if the scraper emits any.
    pub fn subscribe(&self) -> Option<ProgressReceiver> {
        self.scraper.progress().map(|tx| tx.subscribe())
    }

    /// Whether a scrape is in flight.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Start `query` in the background.
    ///
    /// Fails with [`ScrapeError::Busy`] while another scrape is running. The
    /// runner is free again by the time the report arrives.
    pub fn submit(&self, query: ScrapeQuery) -> Result<oneshot::Receiver<ScrapeReport>, ScrapeError> {
        let guard = self
            .gate
            .clone()
            .try_lock_owned()
            .map_err(|_| ScrapeError::Busy)?;
        let (tx, rx) = oneshot::channel();
        let scraper = self.scraper.clone();

        tokio::spawn(async move {
            let report = scraper.run(&query).await;
            drop(guard);
            if tx.send(report).is_err() {
                tracing::debug!("Scrape report dropped: receiver gone");
            }
        });

        Ok(rx)
    }

    /// Submit `query` and wait for its report.
    pub async fn run(&self, query: ScrapeQuery) -> Result<ScrapeReport, ScrapeError> {
        let rx = self.submit(query)?;
        Ok(rx.await.unwrap_or_else(|_| lost_report()))
    }
}

/// Report for a worker that died before reporting.
fn lost_report() -> ScrapeReport {
    ScrapeReport {
        result: Err(ScrapeError::WorkerLost),
        transitions: vec![ScrapeState::Idle, ScrapeState::Failed],
        issues: Vec::new(),
    }
}
