use serde::Deserialize;

/// Main configuration structure for Book-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Config {
    /// URL the crawl starts from: `seed-url` if set, otherwise `base-url`
    pub fn seed_url(&self) -> &str {
        self.site.seed_url.as_deref().unwrap_or(&self.site.base_url)
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site root; thumbnails are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// First listing page (defaults to the base URL)
    #[serde(rename = "seed-url", default)]
    pub seed_url: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of listing pages to visit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Wall-clock budget for a whole crawl (seconds, at most one day)
    #[serde(rename = "crawl-timeout-secs", default = "default_crawl_timeout_secs")]
    pub crawl_timeout_secs: u64,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per page, including the first one
    #[serde(rename = "fetch-attempts", default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Delay before the first retry; doubled after every further attempt (milliseconds)
    #[serde(rename = "backoff-initial-ms", default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Maximum number of items normalized concurrently on one page
    #[serde(rename = "normalize-workers", default = "default_normalize_workers")]
    pub normalize_workers: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            crawl_timeout_secs: default_crawl_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
            backoff_initial_ms: default_backoff_initial_ms(),
            normalize_workers: default_normalize_workers(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Name of the collection replaced by each crawl
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Whether an empty crawl result may replace a collection
    #[serde(rename = "allow-empty-replace", default)]
    pub allow_empty_replace: bool,
}

/// CSS selectors describing the listing markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One match per catalog entry
    pub item: String,

    /// Title link inside an item (`title` attribute, else link text)
    pub title: String,

    /// Price element inside an item
    pub price: String,

    /// Availability element inside an item
    pub availability: String,

    /// Element whose class list carries the rating word
    pub rating: String,

    /// Thumbnail image inside an item
    pub image: String,

    /// Page-level category breadcrumb
    pub category: String,

    /// Page-level link to the next listing page
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Page-level container proving the page is a listing page
    #[serde(rename = "listing-root")]
    pub listing_root: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: ".product_pod".to_string(),
            title: "h3 a".to_string(),
            price: ".price_color".to_string(),
            availability: ".availability".to_string(),
            rating: "p.star-rating".to_string(),
            image: "img".to_string(),
            category: ".breadcrumb li:nth-child(3) a".to_string(),
            next_page: ".next a".to_string(),
            listing_root: "section ol.row".to_string(),
        }
    }
}

impl SelectorConfig {
    /// All selectors paired with their config key, for validation and display
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("item", self.item.as_str()),
            ("title", self.title.as_str()),
            ("price", self.price.as_str()),
            ("availability", self.availability.as_str()),
            ("rating", self.rating.as_str()),
            ("image", self.image.as_str()),
            ("category", self.category.as_str()),
            ("next-page", self.next_page.as_str()),
            ("listing-root", self.listing_root.as_str()),
        ]
    }
}

fn default_max_pages() -> u32 {
    100
}

fn default_crawl_timeout_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_normalize_workers() -> u32 {
    8
}

fn default_collection() -> String {
    "books".to_string()
}
