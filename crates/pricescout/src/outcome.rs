//! Tri-state stage outcomes.
//!
//! Every stage reports success, success-with-issues, or a hard failure as a
//! value. Only the orchestrator decides whether a failure ends the scrape.

use serde::Serialize;

use crate::error::StageError;

/// A problem that was logged and worked around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoftIssue {
    /// A load-state signal did not arrive in time; the stage continued.
    SlowLoad { during: String, waited_ms: u64 },
    /// Writing the delivery postcode into the page failed.
    DeliveryLocation { reason: String },
    /// Result cards never appeared; the stage continued optimistically.
    ResultsNotConfirmed,
    /// Sorting failed; results stay in their existing order.
    SortFailed { reason: String },
    /// The sort parameter was missing from the final URL.
    SortNotConfirmed { url: String },
    /// The store scan could not run; no store listing is reported.
    StoreSearchFailed { reason: String },
    /// A store listing matched but could not be extracted.
    StoreListingUnreadable { position: usize, reason: String },
    /// Loading saved session state failed; a fresh session was used.
    SessionLoad { reason: String },
    /// Saving session state failed.
    SessionSave { reason: String },
}

impl std::fmt::Display for SoftIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlowLoad { during, waited_ms } => {
                write!(f, "page still loading after {waited_ms}ms ({during}), continuing")
            }
            Self::DeliveryLocation { reason } => {
                write!(f, "could not set delivery location: {reason}")
            }
            Self::ResultsNotConfirmed => write!(f, "could not confirm product listings, continuing"),
            Self::SortFailed { reason } => write!(f, "sorting failed, continuing unsorted: {reason}"),
            Self::SortNotConfirmed { url } => {
                write!(f, "sort parameter may not have persisted ({url})")
            }
            Self::StoreSearchFailed { reason } => {
                write!(f, "could not search results for the store: {reason}")
            }
            Self::StoreListingUnreadable { position, reason } => {
                write!(f, "store listing at position {position} unreadable: {reason}")
            }
            Self::SessionLoad { reason } => write!(f, "could not load saved session: {reason}"),
            Self::SessionSave { reason } => write!(f, "could not save session: {reason}"),
        }
    }
}

/// Result of running one stage.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T> {
    Success(T),
    Degraded { value: T, issues: Vec<SoftIssue> },
    /// The stage could not produce a value. `issues` holds whatever was
    /// worked around before it gave up.
    Failure { error: StageError, issues: Vec<SoftIssue> },
}

impl<T> Outcome<T> {
    /// `Success` when `issues` is empty, `Degraded` otherwise.
    pub fn from_parts(value: T, issues: Vec<SoftIssue>) -> Self {
        if issues.is_empty() {
            Self::Success(value)
        } else {
            Self::Degraded { value, issues }
        }
    }

    /// A failure with no soft issues behind it.
    pub fn failed(error: StageError) -> Self {
        Self::Failure {
            error,
            issues: Vec::new(),
        }
    }

    /// Split into the value (or error) and any soft issues.
    pub fn into_parts(self) -> (Result<T, StageError>, Vec<SoftIssue>) {
        match self {
            Self::Success(value) => (Ok(value), Vec::new()),
            Self::Degraded { value, issues } => (Ok(value), issues),
            Self::Failure { error, issues } => (Err(error), issues),
        }
    }
}
