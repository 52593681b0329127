//! Crawl error taxonomy
//!
//! | Error            | Scope | Effect on the crawl                       |
//! |------------------|-------|-------------------------------------------|
//! | `FetchError`     | page  | fatal once non-transient or exhausted     |
//! | `PageParseError` | page  | fatal                                     |
//! | `ItemParseError` | item  | recorded in `CrawlResult.failures`, isolated |
//! | `CommitError`    | run   | fatal, never retried automatically        |

use crate::storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve one page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Request to {url} timed out after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("Request to {url} failed after {attempts} attempt(s): {message}")]
    Network {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Could not build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// The URL the failed request targeted, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url, .. }
            | Self::Network { url, .. }
            | Self::ContentMismatch { url, .. } => Some(url),
            Self::Client(_) => None,
        }
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. }
            | Self::Timeout { attempts, .. }
            | Self::Network { attempts, .. } => *attempts,
            Self::ContentMismatch { .. } => 1,
            Self::Client(_) => 0,
        }
    }

    /// True for failures worth another attempt: timeouts, connection
    /// problems and 5xx responses
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::ContentMismatch { .. } | Self::Client(_) => false,
        }
    }
}

/// A page whose structure could not be understood at all
#[derive(Debug, Error)]
#[error("Could not parse listing page {url}: {message}")]
pub struct PageParseError {
    pub url: String,
    pub message: String,
}

/// A single item that could not become a `Book`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemParseError {
    #[error("missing title")]
    MissingTitle,

    #[error("bad price: {0:?}")]
    BadPrice(String),

    #[error("missing price")]
    MissingPrice,

    #[error("missing detail link")]
    MissingDetailLink,

    #[error("missing thumbnail")]
    MissingThumbnail,

    #[error("bad {field} URL: {message}")]
    BadUrl { field: &'static str, message: String },

    #[error("normalization worker failed: {0}")]
    Worker(String),
}

/// Failure to commit the collection
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Refusing to replace collection '{collection}' with an empty record set")]
    EmptyResult { collection: String },

    #[error("Replacing collection failed: {0}")]
    Storage(#[from] StorageError),
}

/// Reason a crawl ended `Failed`
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    PageParse(#[from] PageParseError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("Crawl exceeded its {0:?} time budget")]
    Timeout(Duration),

    #[error("Crawl was cancelled")]
    Cancelled,

    #[error("Next-page chain still continues after {max_pages} pages (next: {next_url})")]
    PageLimitExceeded { max_pages: u32, next_url: String },

    #[error("Next-page link returns to already visited page {url}")]
    NextLinkCycle { url: String },

    #[error("Another crawl holds the lock on collection '{collection}'")]
    AlreadyRunning { collection: String },

    #[error("Crawl lock bookkeeping failed: {0}")]
    Lock(StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server_error = FetchError::Status {
            url: "https://example.com/".to_string(),
            status: 503,
            attempts: 1,
        };
        assert!(server_error.is_transient());

        let not_found = FetchError::Status {
            url: "https://example.com/".to_string(),
            status: 404,
            attempts: 1,
        };
        assert!(!not_found.is_transient());

        let timeout = FetchError::Timeout {
            url: "https://example.com/".to_string(),
            attempts: 3,
        };
        assert!(timeout.is_transient());

        let mismatch = FetchError::ContentMismatch {
            url: "https://example.com/".to_string(),
            content_type: "application/pdf".to_string(),
        };
        assert!(!mismatch.is_transient());
    }

    #[test]
    fn test_fetch_error_carries_diagnostics() {
        let err = FetchError::Timeout {
            url: "https://example.com/page-2.html".to_string(),
            attempts: 3,
        };
        assert_eq!(err.url(), Some("https://example.com/page-2.html"));
        assert_eq!(err.attempts(), 3);
        assert!(err.to_string().contains("page-2.html"));
        assert!(err.to_string().contains("3 attempt"));
    }

    #[test]
    fn test_item_error_messages() {
        assert_eq!(ItemParseError::MissingTitle.to_string(), "missing title");
        assert_eq!(
            ItemParseError::BadPrice("£abc".to_string()).to_string(),
            "bad price: \"£abc\""
        );
    }
}
