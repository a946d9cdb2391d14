//! One query in, one report out.
//!
//! The [`Scraper`] walks the state machine
//!
//! ```text
//! Idle → Started → Searched → Sorted → Extracted → (Matched) → Done
//!            ↘          ↘                  ↘
//!             Failed     Failed             Failed
//! ```
//!
//! Each state is entered once its step has run. A failed launch, a search
//! that fails or finds nothing, and a failed extraction end in `Failed`;
//! everything else is recorded as a soft issue and the pipeline goes on.
//! The browser session is closed before either terminal state is entered.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, Stage};
use crate::outcome::{Outcome, SoftIssue};
use crate::progress::{self, ProgressEventKind, ProgressSender};
use crate::renderer::{Launcher, RenderContext};
use crate::session::SessionManager;
use crate::stages::extract::ListingExtractor;
use crate::stages::search::{SearchOutcome, SearchStage};
use crate::stages::sort;
use crate::stages::store::StoreMatcher;
use crate::types::{ScrapeQuery, ScrapeResult};

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeState {
    Idle,
    Started,
    Searched,
    Sorted,
    Extracted,
    Matched,
    Done,
    Failed,
}

impl ScrapeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Searched => "searched",
            Self::Sorted => "sorted",
            Self::Extracted => "extracted",
            Self::Matched => "matched",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Everything a scrape produced.
#[derive(Debug)]
pub struct ScrapeReport {
    pub result: Result<ScrapeResult, ScrapeError>,
    /// States in the order they were entered, starting at `Idle`.
    pub transitions: Vec<ScrapeState>,
    pub issues: Vec<SoftIssue>,
}

impl ScrapeReport {
    pub fn terminal_state(&self) -> ScrapeState {
        self.transitions.last().copied().unwrap_or(ScrapeState::Idle)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs scrapes against browsers from one [`Launcher`].
pub struct Scraper {
    sessions: SessionManager,
    config: Arc<ScrapeConfig>,
    progress: Option<ProgressSender>,
}

impl Scraper {
    pub fn new(launcher: Arc<dyn Launcher>, config: ScrapeConfig) -> Self {
        let config = Arc::new(config);
        Self {
            sessions: SessionManager::new(launcher, config.clone()),
            config,
            progress: None,
        }
    }

    /// Emit progress events on `tx`.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn progress(&self) -> Option<&ProgressSender> {
        self.progress.as_ref()
    }

    /// Run one query to completion.
    pub async fn run(&self, query: &ScrapeQuery) -> ScrapeReport {
        let mut run = RunLog::new(self.progress.clone());
        tracing::info!(
            "Scrape started: \"{}\" on {}",
            query.search_term,
            query.region.code
        );

        let started = self.sessions.start(query.region, query.headless).await;
        run.enter(
            ScrapeState::Started,
            format!("Browser started (location: {})", query.region.code),
        );
        let (mut session, issues) = match started {
            Ok(started) => started,
            Err(e) => return run.finish(Err(e)),
        };
        run.note(issues);

        let result = self.drive(session.context_mut(), query, &mut run).await;

        let close_issues = self.sessions.close(session).await;
        run.note(close_issues);
        run.finish(result)
    }

    async fn drive(
        &self,
        ctx: &mut dyn RenderContext,
        query: &ScrapeQuery,
        run: &mut RunLog,
    ) -> Result<ScrapeResult, ScrapeError> {
        let config = self.config.as_ref();
        let region = query.region;

        let searched = SearchStage::new(config, region)
            .run(ctx, &query.search_term)
            .await;
        let mut results_url = match run.absorb(searched) {
            Ok(SearchOutcome::Found {
                results_url,
                card_count,
            }) => {
                run.enter(
                    ScrapeState::Searched,
                    format!("Found {card_count} listings"),
                );
                results_url
            }
            Ok(SearchOutcome::NoResults) => {
                run.enter(ScrapeState::Searched, "No results".to_string());
                return Err(ScrapeError::NoResults {
                    query: query.search_term.clone(),
                });
            }
            Err(e) => {
                run.enter(ScrapeState::Searched, "Search failed".to_string());
                return Err(ScrapeError::Stage {
                    stage: Stage::Search,
                    source: e,
                });
            }
        };

        let strategy = sort::strategy_for(config.sort_mode, config.timeouts, config.pauses);
        match strategy.sort(ctx).await {
            Outcome::Failure { error, issues } => {
                tracing::warn!("Sorting failed, continuing with unsorted results: {error}");
                run.note(issues);
                run.note(vec![SoftIssue::SortFailed {
                    reason: error.to_string(),
                }]);
                run.enter(ScrapeState::Sorted, "Continuing unsorted".to_string());
            }
            sorted => {
                if let Ok(url) = run.absorb(sorted) {
                    results_url = url;
                }
                run.enter(ScrapeState::Sorted, "Results sorted by price".to_string());
            }
        }

        let extractor = ListingExtractor::new(config, region);
        let lowest = match run.absorb(extractor.extract_lowest(ctx).await) {
            Ok(listing) => {
                run.enter(
                    ScrapeState::Extracted,
                    format!("Lowest price: {}", listing.price),
                );
                listing
            }
            Err(e) => {
                run.enter(ScrapeState::Extracted, "Extraction failed".to_string());
                return Err(ScrapeError::Stage {
                    stage: Stage::Extract,
                    source: e,
                });
            }
        };

        let mut your_store = None;
        if let Some(store_name) = &query.store_name {
            let matcher = StoreMatcher::new(config, &extractor);
            match matcher.find_store(ctx, store_name, &results_url).await {
                Outcome::Failure { error, issues } => {
                    tracing::warn!("Store search failed: {error}");
                    run.note(issues);
                    run.note(vec![SoftIssue::StoreSearchFailed {
                        reason: error.to_string(),
                    }]);
                }
                found => {
                    if let Ok(listing) = run.absorb(found) {
                        your_store = listing;
                    }
                }
            }
            let message = match &your_store {
                Some(listing) => format!("Found {store_name} at {}", listing.price),
                None => format!("No listing from {store_name}"),
            };
            run.enter(ScrapeState::Matched, message);
        }

        Ok(ScrapeResult { lowest, your_store })
    }
}

/// Transition and issue bookkeeping for one run.
struct RunLog {
    transitions: Vec<ScrapeState>,
    issues: Vec<SoftIssue>,
    progress: Option<ProgressSender>,
    seq: u64,
}

impl RunLog {
    fn new(progress: Option<ProgressSender>) -> Self {
        Self {
            transitions: vec![ScrapeState::Idle],
            issues: Vec::new(),
            progress,
            seq: 0,
        }
    }

    fn enter(&mut self, state: ScrapeState, message: String) {
        tracing::debug!("→ {state}: {message}");
        self.transitions.push(state);
        progress::emit(
            &self.progress,
            &mut self.seq,
            ProgressEventKind::StateChanged { state, message },
        );
    }

    fn note(&mut self, issues: Vec<SoftIssue>) {
        for issue in issues {
            progress::emit(
                &self.progress,
                &mut self.seq,
                ProgressEventKind::Warning {
                    message: issue.to_string(),
                },
            );
            self.issues.push(issue);
        }
    }

    /// Record a stage's soft issues and hand back its value or error.
    fn absorb<T>(&mut self, outcome: Outcome<T>) -> Result<T, crate::error::StageError> {
        let (value, issues) = outcome.into_parts();
        self.note(issues);
        value
    }

    fn finish(mut self, result: Result<ScrapeResult, ScrapeError>) -> ScrapeReport {
        match &result {
            Ok(_) => self.enter(ScrapeState::Done, "Done".to_string()),
            Err(e) => {
                if e.is_no_results() {
                    tracing::info!("{e}");
                } else {
                    tracing::error!("Scrape failed: {e}");
                }
                self.enter(ScrapeState::Failed, e.user_message());
            }
        }
        ScrapeReport {
            result,
            transitions: self.transitions,
            issues: self.issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_records_transitions_and_issues() {
        let (tx, mut rx) = progress::channel();
        let mut run = RunLog::new(Some(tx));
        run.enter(ScrapeState::Started, "Browser started".to_string());
        run.note(vec![SoftIssue::ResultsNotConfirmed]);

        let report = run.finish(Err(ScrapeError::NoResults {
            query: "x".to_string(),
        }));
        assert_eq!(
            report.transitions,
            vec![ScrapeState::Idle, ScrapeState::Started, ScrapeState::Failed]
        );
        assert_eq!(report.terminal_state(), ScrapeState::Failed);
        assert_eq!(report.issues, vec![SoftIssue::ResultsNotConfirmed]);

        let mut seqs = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seqs.push(event.seq);
        }
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_absorb_keeps_issues_of_degraded_outcome() {
        let mut run = RunLog::new(None);
        let value = run.absorb(Outcome::Degraded {
            value: 7,
            issues: vec![SoftIssue::SortNotConfirmed {
                url: "https://www.ebay.com/sch/i.html".to_string(),
            }],
        });
        assert_eq!(value.unwrap(), 7);
        assert_eq!(run.issues.len(), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ScrapeState::Done.is_terminal());
        assert!(ScrapeState::Failed.is_terminal());
        assert!(!ScrapeState::Matched.is_terminal());
    }
}
