//! Crawl driver - main crawl orchestration logic
//!
//! This module contains the page loop that coordinates one crawl run:
//! - Taking the per-collection crawl lock
//! - Walking the next-page chain one listing page at a time
//! - Normalizing each page's items on a bounded set of tasks
//! - Enforcing the page limit, cycle detection, crawl timeout and cancellation
//! - Handing the records to the collection replacer

use crate::config::Config;
use crate::crawler::error::{CommitError, CrawlError, ItemParseError};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::normalizer::NormalizeContext;
use crate::crawler::parser::{parse_page, ItemFragment};
use crate::crawler::result::{CrawlResult, CrawlStatus, ItemFailure};
use crate::state::CrawlPhase;
use crate::storage::{ReplaceSummary, SqliteStorage, Storage};
use crate::url::{parse_site_url, visit_key};
use crate::HarvestError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Drives one crawl over a paginated catalog into a storage backend
pub struct Crawler<S: Storage> {
    config: Arc<Config>,
    storage: S,
    fetcher: Fetcher,
    seed_url: Url,
    base_url: Url,
    config_hash: Option<String>,
}

impl<S: Storage> Crawler<S> {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `storage` - Storage handle the crawl commits into
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(HarvestError)` - Site URLs unusable or HTTP client could not be built
    pub fn new(config: Config, storage: S) -> Result<Self, HarvestError> {
        let seed_url = parse_site_url(config.seed_url())?;
        let base_url = parse_site_url(&config.site.base_url)?;
        let fetcher = Fetcher::new(&config).map_err(CrawlError::from)?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
            seed_url,
            base_url,
            config_hash: None,
        })
    }

    /// Records `hash` as the configuration fingerprint of every commit
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Gives the storage handle back, e.g. to close it
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs a crawl to completion
    pub async fn run(&mut self) -> CrawlResult {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Runs a crawl that stops with `CrawlError::Cancelled` once `cancel` fires
    ///
    /// Cancellation is observed between steps and during fetches. It is not
    /// observed once the replacement has started.
    pub async fn run_until_cancelled(&mut self, cancel: CancellationToken) -> CrawlResult {
        let collection = self.config.output.collection.clone();
        let mut result = CrawlResult::new(&collection);
        let holder = format!(
            "pid-{}-{}",
            std::process::id(),
            result.started_at.timestamp_nanos_opt().unwrap_or_default()
        );
        let budget = Duration::from_secs(self.config.crawler.crawl_timeout_secs);

        tracing::info!(
            "Starting crawl of {} into collection '{}'",
            self.seed_url,
            collection
        );

        match self
            .storage
            .acquire_crawl_lock(&collection, &holder, stale_after(budget))
        {
            Ok(true) => {}
            Ok(false) => {
                fail(&mut result, CrawlError::AlreadyRunning { collection });
                return finish(result);
            }
            Err(e) => {
                fail(&mut result, CrawlError::Lock(e));
                return finish(result);
            }
        }

        match self.walk(&mut result, &cancel, budget).await {
            Ok(()) => {
                enter(&mut result, CrawlPhase::Done);
                match self.commit(&result) {
                    Ok(summary) => {
                        result.status = CrawlStatus::Completed;
                        result.commit = Some(summary);
                    }
                    Err(e) => {
                        tracing::error!("Commit to '{}' failed: {}", collection, e);
                        result.failed_in = Some(CrawlPhase::Done);
                        result.error = Some(e.into());
                    }
                }
            }
            Err(e) => fail(&mut result, e),
        }

        if let Err(e) = self.storage.release_crawl_lock(&collection, &holder) {
            tracing::warn!("Could not release crawl lock on '{}': {}", collection, e);
        }

        finish(result)
    }

    /// Walks the next-page chain, accumulating records and item failures
    async fn walk(
        &self,
        result: &mut CrawlResult,
        cancel: &CancellationToken,
        budget: Duration,
    ) -> Result<(), CrawlError> {
        let deadline = deadline_after(budget);
        let max_pages = self.config.crawler.max_pages;
        let workers = self.config.crawler.normalize_workers.max(1) as usize;

        let mut visited = HashSet::new();
        let mut next = Some(self.seed_url.clone());

        while let Some(page_url) = next.take() {
            enter(result, CrawlPhase::FetchPage);
            check_interrupt(cancel, deadline, budget)?;
            visited.insert(visit_key(&page_url));

            tracing::info!("Fetching page {} ({})", result.pages_visited + 1, page_url);
            let html = guarded(cancel, deadline, budget, self.fetcher.fetch(&page_url)).await??;
            result.pages_visited += 1;

            enter(result, CrawlPhase::ParsePage);
            let page = parse_page(&html, &page_url, &self.config.selectors)?;

            enter(result, CrawlPhase::NormalizeItems);
            check_interrupt(cancel, deadline, budget)?;
            let context = Arc::new(NormalizeContext {
                page_url: page_url.clone(),
                base_url: self.base_url.clone(),
                category_hint: page.category_hint,
            });
            let outcomes = guarded(
                cancel,
                deadline,
                budget,
                normalize_items(context, page.items, workers),
            )
            .await?;

            let before = result.failures.len();
            for (fragment, outcome) in outcomes {
                match outcome {
                    Ok(book) => result.records.push(book),
                    Err(reason) => {
                        let failure = ItemFailure {
                            page_url: page_url.to_string(),
                            item_index: fragment.index,
                            title: fragment.title_attr.or(fragment.title_text),
                            reason,
                        };
                        tracing::warn!("Skipping {}", failure);
                        result.failures.push(failure);
                    }
                }
            }
            tracing::debug!(
                "Page {} done: {} record(s) so far, {} new failure(s)",
                page_url,
                result.records.len(),
                result.failures.len() - before
            );

            enter(result, CrawlPhase::Advance);
            if let Some(next_url) = page.next_page_url {
                if visited.contains(&visit_key(&next_url)) {
                    return Err(CrawlError::NextLinkCycle {
                        url: next_url.to_string(),
                    });
                }
                if result.pages_visited >= max_pages as usize {
                    return Err(CrawlError::PageLimitExceeded {
                        max_pages,
                        next_url: next_url.to_string(),
                    });
                }
                next = Some(next_url);
            }
        }

        Ok(())
    }

    /// Replaces the collection with the accumulated records
    fn commit(&mut self, result: &CrawlResult) -> Result<ReplaceSummary, CommitError> {
        let collection = &self.config.output.collection;

        if result.records.is_empty() {
            if !self.config.output.allow_empty_replace {
                tracing::warn!(
                    "Crawl produced no records; leaving collection '{}' untouched",
                    collection
                );
                return Err(CommitError::EmptyResult {
                    collection: collection.clone(),
                });
            }
            tracing::warn!("Replacing collection '{}' with an empty record set", collection);
        }

        tracing::info!(
            "Committing {} record(s) to collection '{}'",
            result.records.len(),
            collection
        );
        let summary = self.storage.replace_collection(
            collection,
            &result.records,
            self.config_hash.as_deref(),
        )?;

        tracing::info!(
            "Replaced collection '{}': {} -> {} record(s)",
            collection,
            summary.previous_count,
            summary.inserted
        );
        Ok(summary)
    }
}

/// Normalizes one page's items on spawned tasks, at most `workers` at a time
///
/// Outcomes come back in document order regardless of completion order.
async fn normalize_items(
    context: Arc<NormalizeContext>,
    items: Vec<ItemFragment>,
    workers: usize,
) -> Vec<(ItemFragment, Result<crate::book::Book, ItemParseError>)> {
    stream::iter(items)
        .map(|fragment| {
            let context = Arc::clone(&context);
            async move {
                let task_fragment = fragment.clone();
                let outcome = tokio::spawn(async move { context.normalize(&task_fragment) })
                    .await
                    .unwrap_or_else(|e| Err(ItemParseError::Worker(e.to_string())));
                (fragment, outcome)
            }
        })
        .buffered(workers)
        .collect()
        .await
}

/// Moves `result` to `next`, refusing transitions the phase graph forbids
fn enter(result: &mut CrawlResult, next: CrawlPhase) {
    if result.phase.can_transition_to(next) {
        tracing::trace!("Phase {} -> {}", result.phase, next);
        result.phase = next;
    } else {
        tracing::error!("Rejected phase transition {} -> {}", result.phase, next);
    }
}

fn fail(result: &mut CrawlResult, error: CrawlError) {
    tracing::error!("Crawl failed during {}: {}", result.phase, error);
    result.failed_in = Some(result.phase);
    result.error = Some(error);
    result.status = CrawlStatus::Failed;
    enter(result, CrawlPhase::Failed);
}

fn finish(mut result: CrawlResult) -> CrawlResult {
    result.finished_at = Utc::now();
    tracing::info!("{} in {}ms", result, result.duration().num_milliseconds());
    result
}

/// Age after which another run's lock is taken over
fn stale_after(budget: Duration) -> Duration {
    budget.checked_mul(2).unwrap_or(Duration::MAX)
}

/// Instant the crawl budget runs out, saturating at about thirty years out
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn check_interrupt(
    cancel: &CancellationToken,
    deadline: Instant,
    budget: Duration,
) -> Result<(), CrawlError> {
    if cancel.is_cancelled() {
        Err(CrawlError::Cancelled)
    } else if Instant::now() >= deadline {
        Err(CrawlError::Timeout(budget))
    } else {
        Ok(())
    }
}

/// Races `work` against cancellation and the crawl deadline
async fn guarded<F: Future>(
    cancel: &CancellationToken,
    deadline: Instant,
    budget: Duration,
    work: F,
) -> Result<F::Output, CrawlError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CrawlError::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Err(CrawlError::Timeout(budget)),
        output = work => Ok(output),
    }
}

/// Runs a complete crawl against the configured SQLite database
///
/// Opens the database, runs the crawl and closes the database again.
///
/// # Example
///
/// ```no_run
/// # use book_harvest::config::load_config;
/// # use book_harvest::run_crawl;
/// # use std::path::Path;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let result = run_crawl(config, None).await?;
/// println!("{}", result);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    config_hash: Option<String>,
) -> Result<CrawlResult, HarvestError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    let mut crawler = Crawler::new(config, storage)?;
    if let Some(hash) = config_hash {
        crawler = crawler.with_config_hash(hash);
    }

    let result = crawler.run().await;
    crawler.into_storage().close()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn create_test_config() -> Config {
        parse_config(
            r#"
[site]
base-url = "http://127.0.0.1:9/"

[crawler]
fetch-attempts = 1
request-timeout-secs = 1

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = ":memory:"
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crawler_creation() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let crawler = Crawler::new(create_test_config(), storage);
        assert!(crawler.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_fetch() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let mut crawler = Crawler::new(create_test_config(), storage).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = crawler.run_until_cancelled(cancel).await;

        assert_eq!(result.status, CrawlStatus::Failed);
        assert_eq!(result.phase, CrawlPhase::Failed);
        assert_eq!(result.failed_in, Some(CrawlPhase::FetchPage));
        assert!(matches!(result.error, Some(CrawlError::Cancelled)));
        assert_eq!(result.pages_visited, 0);
    }

    #[tokio::test]
    async fn test_oversized_budget_does_not_overflow() {
        let mut config = create_test_config();
        config.crawler.crawl_timeout_secs = u64::MAX;
        let storage = SqliteStorage::new_in_memory().unwrap();
        let mut crawler = Crawler::new(config, storage).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = crawler.run_until_cancelled(cancel).await;

        assert_eq!(result.failed_in, Some(CrawlPhase::FetchPage));
        assert!(matches!(result.error, Some(CrawlError::Cancelled)));
    }

    #[test]
    fn test_budget_arithmetic_saturates() {
        assert_eq!(stale_after(Duration::from_secs(u64::MAX)), Duration::MAX);
        assert_eq!(stale_after(Duration::from_secs(600)), Duration::from_secs(1200));

        let before = Instant::now();
        assert!(deadline_after(Duration::MAX) > before + Duration::from_secs(86_400));
        assert!(deadline_after(Duration::from_secs(5)) <= Instant::now() + Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_held_lock_rejects_crawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .acquire_crawl_lock("books", "someone-else", Duration::from_secs(3600))
            .unwrap();

        let mut crawler = Crawler::new(create_test_config(), storage).unwrap();
        let result = crawler.run().await;

        assert!(matches!(
            result.error,
            Some(CrawlError::AlreadyRunning { ref collection }) if collection == "books"
        ));
        assert_eq!(result.failed_in, Some(CrawlPhase::Start));
    }

    #[tokio::test]
    async fn test_lock_released_after_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let mut crawler = Crawler::new(create_test_config(), storage).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        crawler.run_until_cancelled(cancel).await;

        let mut storage = crawler.into_storage();
        assert!(storage
            .acquire_crawl_lock("books", "next-run", Duration::from_secs(3600))
            .unwrap());
    }

    #[tokio::test]
    async fn test_normalize_items_keeps_document_order() {
        let context = Arc::new(NormalizeContext {
            page_url: Url::parse("https://books.toscrape.com/catalogue/page-1.html").unwrap(),
            base_url: Url::parse("https://books.toscrape.com/").unwrap(),
            category_hint: None,
        });
        let items: Vec<ItemFragment> = (0..20)
            .map(|i| ItemFragment {
                index: i,
                title_attr: Some(format!("Book {}", i)),
                href: Some(format!("book_{}/index.html", i)),
                price_text: Some(if i == 7 { "£??".to_string() } else { format!("£{}.00", i) }),
                availability_text: Some("In stock".to_string()),
                rating_class: Some("star-rating Two".to_string()),
                image_src: Some(format!("media/{}.jpg", i)),
                ..ItemFragment::default()
            })
            .collect();

        let outcomes = normalize_items(context, items, 3).await;

        assert_eq!(outcomes.len(), 20);
        for (i, (fragment, outcome)) in outcomes.iter().enumerate() {
            assert_eq!(fragment.index, i);
            if i == 7 {
                assert!(matches!(outcome, Err(ItemParseError::BadPrice(_))));
            } else {
                assert_eq!(outcome.as_ref().unwrap().title(), format!("Book {}", i));
            }
        }
    }
}
