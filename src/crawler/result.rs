//! Outcome of one crawl run
//!
//! `CrawlResult` is returned to whatever triggered the crawl; it is not
//! persisted.

use crate::book::Book;
use crate::crawler::error::{CrawlError, ItemParseError};
use crate::state::CrawlPhase;
use crate::storage::ReplaceSummary;
use chrono::{DateTime, Utc};
use std::fmt;

/// Terminal status of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Completed,
    Failed,
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One item that was excluded from the output
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    /// Listing page the item was found on
    pub page_url: String,

    /// Position of the item on that page, 0-based
    pub item_index: usize,

    /// Whatever title could be read, to help locate the item
    pub title: Option<String>,

    pub reason: ItemParseError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} item #{}", self.page_url, self.item_index)?;
        if let Some(title) = &self.title {
            write!(f, " ({:?})", title)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Everything a crawl run produced
#[derive(Debug)]
pub struct CrawlResult {
    /// Collection the run targeted
    pub collection: String,

    pub status: CrawlStatus,

    /// Terminal phase reached (`Done` or `Failed`)
    pub phase: CrawlPhase,

    /// Phase in which the run failed, if it did
    pub failed_in: Option<CrawlPhase>,

    /// Listing pages fetched, including one that then failed to parse
    pub pages_visited: usize,

    /// Books extracted, in source order
    pub records: Vec<Book>,

    /// Items excluded from `records`
    pub failures: Vec<ItemFailure>,

    /// Present when the replace step committed
    pub commit: Option<ReplaceSummary>,

    /// Why the run failed
    pub error: Option<CrawlError>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    pub(crate) fn new(collection: &str) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.to_string(),
            status: CrawlStatus::Failed,
            phase: CrawlPhase::Start,
            failed_in: None,
            pages_visited: 0,
            records: Vec::new(),
            failures: Vec::new(),
            commit: None,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// Number of books extracted
    pub fn records_extracted(&self) -> usize {
        self.records.len()
    }

    pub fn is_completed(&self) -> bool {
        self.status == CrawlStatus::Completed
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for CrawlResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "crawl {}: {} page(s), {} record(s), {} failure(s)",
            self.status,
            self.pages_visited,
            self.records_extracted(),
            self.failures.len()
        )?;
        if let Some(commit) = &self.commit {
            write!(
                f,
                ", replaced {} -> {} in '{}'",
                commit.previous_count, commit.inserted, self.collection
            )?;
        }
        if let Some(error) = &self.error {
            write!(f, " [{} in {}]", error, self.failed_in.unwrap_or(self.phase))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_pending_failure() {
        let result = CrawlResult::new("books");
        assert_eq!(result.status, CrawlStatus::Failed);
        assert_eq!(result.phase, CrawlPhase::Start);
        assert_eq!(result.records_extracted(), 0);
        assert!(!result.is_completed());
    }

    #[test]
    fn test_item_failure_display() {
        let failure = ItemFailure {
            page_url: "https://books.toscrape.com/catalogue/page-1.html".to_string(),
            item_index: 4,
            title: Some("Soumission".to_string()),
            reason: ItemParseError::BadPrice("£??".to_string()),
        };
        let text = failure.to_string();
        assert!(text.contains("item #4"));
        assert!(text.contains("Soumission"));
        assert!(text.contains("bad price"));
    }

    #[test]
    fn test_summary_display() {
        let mut result = CrawlResult::new("books");
        result.status = CrawlStatus::Completed;
        result.pages_visited = 2;
        result.commit = Some(ReplaceSummary {
            previous_count: 5,
            inserted: 0,
        });
        let text = result.to_string();
        assert!(text.starts_with("crawl completed: 2 page(s)"));
        assert!(text.contains("replaced 5 -> 0"));
    }
}
