//! Crawler module for walking a paginated catalog
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Structural parsing of listing pages
//! - Normalization of item fragments into books
//! - Overall crawl coordination and the final collection replacement

mod coordinator;
mod document;
mod error;
mod fetcher;
mod normalizer;
mod parser;
mod result;

pub use coordinator::{run_crawl, Crawler};
pub use document::{DocumentQuery, NodeQuery, QueryError, ScraperDocument, ScraperNode};
pub use error::{CommitError, CrawlError, FetchError, ItemParseError, PageParseError};
pub use fetcher::{build_http_client, user_agent_string, Fetcher, RetryPolicy};
pub use normalizer::{normalize, parse_price, NormalizeContext};
pub use parser::{parse_listing, parse_page, ItemFragment, ListingPage};
pub use result::{CrawlResult, CrawlStatus, ItemFailure};
