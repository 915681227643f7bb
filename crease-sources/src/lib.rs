//! crease-sources
//!
//! Source adapters for the public cricket sites the engine scrapes, plus the
//! production page fetcher.
//!
//! - [`ScrapeSession`] holds the shared scrape pipeline: proxy selection,
//!   user-agent rotation, jittered pacing, rule-chain extraction with selector
//!   health reporting, parsing, and the structural check.
//! - [`CricbuzzSource`], [`EspnCricinfoSource`], and [`CrexSource`] are thin
//!   per-site types that supply a [`SiteProfile`] and delegate to a session.
//! - [`HttpFetcher`] fetches pages with `reqwest` and parses them into
//!   [`HtmlPage`], which evaluates CSS selectors with `scraper`.
#![warn(missing_docs)]

mod crex;
mod cricbuzz;
mod espncricinfo;
mod html;
mod http;
mod session;

use crease_core::{CreaseError, RuleDocument};

pub use crex::CrexSource;
pub use cricbuzz::CricbuzzSource;
pub use espncricinfo::EspnCricinfoSource;
pub use html::HtmlPage;
pub use http::HttpFetcher;
pub use session::{ScrapeContext, ScrapeSession, SiteProfile};

const DEFAULT_RULES: &str = include_str!("../rules/default.json");

/// Rule document covering every bundled source.
///
/// # Errors
/// Only fails if the bundled document is malformed.
pub fn default_rules() -> Result<RuleDocument, CreaseError> {
    RuleDocument::from_json(DEFAULT_RULES)
}
