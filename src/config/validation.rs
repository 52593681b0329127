use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig, UserAgentConfig,
};
use crate::url::parse_site_url;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates the target site URLs
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    parse_site_url(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if let Some(seed) = &config.seed_url {
        parse_site_url(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed-url '{}': {}", seed, e)))?;
    }

    Ok(())
}

/// Longest crawl budget accepted, one day
const MAX_CRAWL_TIMEOUT_SECS: u64 = 86_400;

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.crawl_timeout_secs < 1 || config.crawl_timeout_secs > MAX_CRAWL_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "crawl_timeout_secs must be between 1 and {}, got {}",
            MAX_CRAWL_TIMEOUT_SECS, config.crawl_timeout_secs
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.fetch_attempts < 1 || config.fetch_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "fetch_attempts must be between 1 and 10, got {}",
            config.fetch_attempts
        )));
    }

    if config.normalize_workers < 1 || config.normalize_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "normalize_workers must be between 1 and 64, got {}",
            config.normalize_workers
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.collection.is_empty() {
        return Err(ConfigError::Validation(
            "collection cannot be empty".to_string(),
        ));
    }

    if !config
        .collection
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "collection must contain only ASCII letters, digits, '_' and '-', got '{}'",
            config.collection
        )));
    }

    Ok(())
}

/// Validates that every selector compiles
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (field, selector) in config.entries() {
        if selector.trim().is_empty() || Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                field: field.to_string(),
                selector: selector.to_string(),
            });
        }
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_default_selectors_are_valid() {
        assert!(validate_selectors(&SelectorConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = SelectorConfig {
            price: "..price[".to_string(),
            ..SelectorConfig::default()
        };
        let err = validate_selectors(&selectors).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_crawler_bounds() {
        let mut config = CrawlerConfig::default();
        assert!(validate_crawler_config(&config).is_ok());

        config.fetch_attempts = 0;
        assert!(validate_crawler_config(&config).is_err());

        config = CrawlerConfig {
            normalize_workers: 65,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());

        config = CrawlerConfig {
            max_pages: 0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_crawl_timeout_upper_bound() {
        let mut config = CrawlerConfig {
            crawl_timeout_secs: MAX_CRAWL_TIMEOUT_SECS,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_ok());

        config.crawl_timeout_secs = MAX_CRAWL_TIMEOUT_SECS + 1;
        assert!(validate_crawler_config(&config).is_err());

        config.crawl_timeout_secs = 9_223_372_036_854_775_807;
        let err = validate_crawler_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("crawl_timeout_secs")));
    }

    #[test]
    fn test_collection_name_characters() {
        let mut output = OutputConfig {
            database_path: "./books.db".to_string(),
            collection: "books_2024".to_string(),
            allow_empty_replace: false,
        };
        assert!(validate_output_config(&output).is_ok());

        output.collection = "books; DROP TABLE".to_string();
        assert!(validate_output_config(&output).is_err());
    }

    #[test]
    fn test_site_urls() {
        let site = SiteConfig {
            base_url: "https://books.toscrape.com/".to_string(),
            seed_url: Some("https://books.toscrape.com/catalogue/page-1.html".to_string()),
        };
        assert!(validate_site_config(&site).is_ok());

        let site = SiteConfig {
            base_url: "books.toscrape.com".to_string(),
            seed_url: None,
        };
        assert!(matches!(
            validate_site_config(&site),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
