//! Crawl phase definitions for the page-by-page walk
//!
//! The driver moves through these phases once per listing page until it
//! reaches one of the two terminal phases.

use std::fmt;

/// Phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// Seed URL chosen, nothing fetched yet
    Start,

    /// Fetching the current listing page
    FetchPage,

    /// Extracting item fragments, category hint and next link
    ParsePage,

    /// Turning item fragments into books
    NormalizeItems,

    /// Deciding whether to follow the next link
    Advance,

    // ===== Terminal Phases =====
    /// Every page walked; records handed to the replacer
    Done,

    /// The crawl stopped without committing
    Failed,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this phase
    ///
    /// `Failed` is reachable from every active phase, since the crawl-wide
    /// timeout and cancellation are checked between all steps.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        if self.is_terminal() {
            return false;
        }

        if next == Self::Failed {
            return true;
        }

        matches!(
            (self, next),
            (Self::Start, Self::FetchPage)
                | (Self::FetchPage, Self::ParsePage)
                | (Self::ParsePage, Self::NormalizeItems)
                | (Self::NormalizeItems, Self::Advance)
                | (Self::Advance, Self::FetchPage)
                | (Self::Advance, Self::Done)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchPage => "fetch_page",
            Self::ParsePage => "parse_page",
            Self::NormalizeItems => "normalize_items",
            Self::Advance => "advance",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
