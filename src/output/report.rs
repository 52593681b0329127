//! Plain-text reports for crawl runs and book listings

use crate::crawler::CrawlResult;
use crate::storage::BookPage;

/// Maximum number of item failures listed individually
const MAX_LISTED_FAILURES: usize = 20;

/// Formats a finished crawl run
///
/// # Arguments
///
/// * `result` - The crawl result to describe
///
/// # Returns
///
/// A multi-line plain-text report
pub fn format_crawl_result(result: &CrawlResult) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Result ===\n\n");
    out.push_str(&format!("Collection: {}\n", result.collection));
    out.push_str(&format!("Status: {}\n", result.status));
    out.push_str(&format!("Final phase: {}\n", result.phase));
    out.push_str(&format!(
        "Duration: {:.1}s\n",
        result.duration().num_milliseconds() as f64 / 1000.0
    ));
    out.push_str(&format!("Pages visited: {}\n", result.pages_visited));
    out.push_str(&format!("Records extracted: {}\n", result.records_extracted()));
    out.push_str(&format!("Item failures: {}\n", result.failures.len()));

    if let Some(commit) = &result.commit {
        out.push_str(&format!(
            "Replaced: {} -> {} record(s)\n",
            commit.previous_count, commit.inserted
        ));
    }

    if let Some(error) = &result.error {
        let phase = result.failed_in.unwrap_or(result.phase);
        out.push_str(&format!("Error ({}): {}\n", phase, error));
    }

    if !result.failures.is_empty() {
        out.push_str("\nSkipped items:\n");
        for failure in result.failures.iter().take(MAX_LISTED_FAILURES) {
            out.push_str(&format!("  - {}\n", failure));
        }
        if result.failures.len() > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "  ... and {} more\n",
                result.failures.len() - MAX_LISTED_FAILURES
            ));
        }
    }

    out
}

pub fn print_crawl_result(result: &CrawlResult) {
    print!("{}", format_crawl_result(result));
}

/// Formats one page of stored books as a table-like listing
pub fn format_book_page(page: &BookPage) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Page {} of {} ({} matching book(s))\n\n",
        page.page,
        page.total_pages.max(1),
        page.total
    ));

    for stored in &page.books {
        let book = &stored.book;
        out.push_str(&format!(
            "#{:<6} {:>8.2}  {:<7} {:<12} {:<20} {}\n",
            stored.id,
            book.price(),
            book.rating().to_string(),
            if book.in_stock() { "in stock" } else { "out of stock" },
            book.category(),
            book.title()
        ));
    }

    if page.books.is_empty() {
        out.push_str("No books found\n");
    }

    out
}

pub fn print_book_page(page: &BookPage) {
    print!("{}", format_book_page(page));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Book, Rating, StoredBook};
    use crate::crawler::{CrawlStatus, ItemFailure, ItemParseError};
    use url::Url;

    #[test]
    fn test_crawl_report_lists_failures() {
        let mut result = CrawlResult::new("books");
        result.status = CrawlStatus::Completed;
        result.pages_visited = 2;
        result.failures.push(ItemFailure {
            page_url: "https://books.toscrape.com/catalogue/page-1.html".to_string(),
            item_index: 3,
            title: None,
            reason: ItemParseError::MissingTitle,
        });

        let text = format_crawl_result(&result);
        assert!(text.contains("Status: completed"));
        assert!(text.contains("Pages visited: 2"));
        assert!(text.contains("item #3: missing title"));
    }

    #[test]
    fn test_book_page_listing() {
        let book = Book::new(
            "Sharp Objects",
            47.82,
            "In stock",
            Rating::Four,
            Url::parse("https://books.toscrape.com/catalogue/sharp-objects_997/index.html").unwrap(),
            Url::parse("https://books.toscrape.com/media/x.jpg").unwrap(),
            "Mystery",
        )
        .unwrap();
        let page = BookPage {
            books: vec![StoredBook { id: 7, book }],
            total: 1,
            page: 1,
            total_pages: 1,
        };

        let text = format_book_page(&page);
        assert!(text.contains("Page 1 of 1 (1 matching book(s))"));
        assert!(text.contains("47.82"));
        assert!(text.contains("Sharp Objects"));
        assert!(text.contains("Mystery"));
    }

    #[test]
    fn test_empty_book_page() {
        let page = BookPage {
            books: vec![],
            total: 0,
            page: 1,
            total_pages: 0,
        };
        assert!(format_book_page(&page).contains("No books found"));
    }
}
