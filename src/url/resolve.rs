use crate::UrlError;
use url::Url;

/// Parses a configured site URL (base or seed)
///
/// Only `http` and `https` URLs with a host are accepted. The fragment is
/// dropped since it never reaches the server.
///
/// # Examples
///
/// ```
/// use book_harvest::url::parse_site_url;
///
/// let url = parse_site_url("https://books.toscrape.com/#top").unwrap();
/// assert_eq!(url.as_str(), "https://books.toscrape.com/");
/// ```
pub fn parse_site_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::Parse(format!("Missing host in URL: {}", url_str)));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a link `href` (or image `src`) against a base URL
///
/// Rejects:
/// - empty values
/// - `javascript:`, `mailto:`, `tel:` and `data:` targets
/// - anything that does not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use book_harvest::url::resolve_href;
/// use url::Url;
///
/// let page = Url::parse("https://books.toscrape.com/catalogue/page-2.html").unwrap();
/// let detail = resolve_href("a-light-in-the-attic_1000/index.html", &page).unwrap();
/// assert_eq!(
///     detail.as_str(),
///     "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html"
/// );
/// ```
pub fn resolve_href(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return Err(UrlError::Unsupported(href.to_string()));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    match resolved.scheme() {
        "http" | "https" => Ok(resolved),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

/// Key used to detect revisits of the same page
///
/// Two URLs that differ only by fragment address the same listing page.
pub fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://books.toscrape.com/catalogue/page-2.html").unwrap()
    }

    #[test]
    fn test_parse_site_url_accepts_http_and_https() {
        assert!(parse_site_url("http://127.0.0.1:8080/").is_ok());
        assert!(parse_site_url("https://books.toscrape.com/").is_ok());
    }

    #[test]
    fn test_parse_site_url_rejects_other_schemes() {
        assert!(matches!(
            parse_site_url("ftp://books.toscrape.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(parse_site_url("not a url").is_err());
    }

    #[test]
    fn test_resolve_relative_to_page() {
        let url = resolve_href("page-3.html", &page_url()).unwrap();
        assert_eq!(url.as_str(), "https://books.toscrape.com/catalogue/page-3.html");
    }

    #[test]
    fn test_resolve_parent_segments_against_site_root() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        let url = resolve_href("../media/cache/2c/da/cover.jpg", &base).unwrap();
        assert_eq!(url.as_str(), "https://books.toscrape.com/media/cache/2c/da/cover.jpg");
    }

    #[test]
    fn test_resolve_absolute_href_unchanged() {
        let url = resolve_href("https://cdn.example.com/a.jpg", &page_url()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_resolve_rejects_special_schemes() {
        assert!(matches!(
            resolve_href("javascript:void(0)", &page_url()),
            Err(UrlError::Unsupported(_))
        ));
        assert!(matches!(
            resolve_href("mailto:shop@example.com", &page_url()),
            Err(UrlError::Unsupported(_))
        ));
        assert!(matches!(resolve_href("   ", &page_url()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_visit_key_ignores_fragment() {
        let a = Url::parse("https://books.toscrape.com/catalogue/page-2.html#top").unwrap();
        let b = Url::parse("https://books.toscrape.com/catalogue/page-2.html").unwrap();
        assert_eq!(visit_key(&a), visit_key(&b));
    }
}
