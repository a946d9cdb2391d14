//! pricescout: find the lowest-priced marketplace listing for a query.
//!
//! A browser is driven through a fixed pipeline (search, sort, extract and
//! optionally match a seller) that tolerates storefront markup changing
//! under it: every element is found through ordered selector fallbacks,
//! price text is normalized, and problems that do not block a result are
//! reported rather than raised.

pub mod config;
pub mod dom;
pub mod error;
pub mod locator;
pub mod orchestrator;
pub mod outcome;
pub mod price;
pub mod progress;
pub mod region;
pub mod renderer;
pub mod runner;
pub mod selector;
pub mod session;
pub mod site;
pub mod stages;
pub mod state;
pub mod types;

pub use config::{CurrencyFallback, ScrapeConfig, SortMode};
pub use error::{ScrapeError, Stage, StageError};
pub use orchestrator::{ScrapeReport, ScrapeState, Scraper};
pub use outcome::{Outcome, SoftIssue};
pub use price::{CurrencySymbol, PriceAmount, PriceNormalizer};
pub use region::RegionProfile;
pub use runner::ScrapeRunner;
pub use types::{Listing, PriceComparison, ScrapeQuery, ScrapeResult};
