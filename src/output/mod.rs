//! Output module for operator-facing reports
//!
//! This module handles:
//! - Summaries of finished crawl runs
//! - Listings of stored books
//! - Statistics about a stored collection

mod report;
pub mod stats;

pub use report::{format_book_page, format_crawl_result, print_book_page, print_crawl_result};
pub use stats::{format_statistics, load_statistics, print_statistics, CollectionStatistics};
