//! Error types for the scrape pipeline.

use std::fmt;

use serde::Serialize;

/// Which pipeline stage produced a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Search,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Extract => write!(f, "extract"),
        }
    }
}

/// Hard failure inside a single stage.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("could not find the search box")]
    SearchInputNotFound,

    #[error("could not find the first result card")]
    ListingNotFound,

    #[error("could not find a link in the result card")]
    LinkNotFound,

    #[error("could not extract a price from {url}")]
    PriceNotFound { url: String },

    #[error("results URL {url} is not usable: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not find the sort control")]
    SortControlNotFound,

    #[error("could not find a lowest-price sort option")]
    SortOptionNotFound,

    #[error("browser error: {0}")]
    Browser(String),
}

impl StageError {
    pub(crate) fn browser(e: anyhow::Error) -> Self {
        Self::Browser(format!("{e:#}"))
    }
}

/// Terminal failure of a whole scrape.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("a scrape is already in progress")]
    Busy,

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("no results for \"{query}\"")]
    NoResults { query: String },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("scrape worker ended without reporting")]
    WorkerLost,
}

impl ScrapeError {
    /// True when the search ran but found nothing.
    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults { .. })
    }

    /// One consolidated message for end users; never internal diagnostics.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoResults { query } => format!("No results found for \"{query}\"."),
            Self::InvalidQuery(_) => "Please enter a product name to search.".to_string(),
            Self::Busy => "A search is already in progress.".to_string(),
            Self::Launch(_) | Self::Stage { .. } | Self::WorkerLost => {
                "Could not complete the search due to an error. Please try again.".to_string()
            }
        }
    }
}

/// Errors reading or writing persisted session state.
#[derive(thiserror::Error, Debug)]
pub enum SessionStoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session file {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_distinguishes_no_results() {
        let none = ScrapeError::NoResults {
            query: "iphone 15 pro".to_string(),
        };
        assert!(none.is_no_results());
        assert!(none.user_message().contains("No results"));

        let failed = ScrapeError::Stage {
            stage: Stage::Extract,
            source: StageError::PriceNotFound {
                url: "https://www.ebay.co.uk/itm/1".to_string(),
            },
        };
        assert!(!failed.is_no_results());
        let msg = failed.user_message();
        assert!(msg.contains("due to an error"));
        assert!(!msg.contains("itm/1"));
    }

    #[test]
    fn test_display_includes_stage() {
        let err = ScrapeError::Stage {
            stage: Stage::Search,
            source: StageError::SearchInputNotFound,
        };
        assert_eq!(err.to_string(), "search stage failed: could not find the search box");
    }
}
