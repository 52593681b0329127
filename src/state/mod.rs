//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the driver's position in the page-by-page walk

mod crawl_phase;

pub use crawl_phase::CrawlPhase;
