//! Listing page parser
//!
//! This module turns one listing page into:
//! - the ordered item fragments found on it
//! - the page's category hint (breadcrumb), if any
//! - the absolute URL of the next listing page, if any
//!
//! Parsing is purely structural: no network access, no normalization. A page
//! that shows no sign of being a listing page is an error rather than an
//! empty page, so a broken page never silently truncates the crawl.

use crate::config::SelectorConfig;
use crate::crawler::document::{DocumentQuery, NodeQuery, QueryError, ScraperDocument};
use crate::crawler::error::PageParseError;
use crate::url::resolve_href;
use url::Url;

/// Raw markup values of one catalog entry, not yet validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFragment {
    /// Position on the page, 0-based, in document order
    pub index: usize,

    /// `title` attribute of the title link
    pub title_attr: Option<String>,

    /// Text of the title link (often truncated by the site)
    pub title_text: Option<String>,

    /// `href` of the title link
    pub href: Option<String>,

    /// Price text including its currency symbol
    pub price_text: Option<String>,

    /// Stock phrase
    pub availability_text: Option<String>,

    /// Class list of the rating element
    pub rating_class: Option<String>,

    /// `src` of the thumbnail image
    pub image_src: Option<String>,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<ItemFragment>,
    pub category_hint: Option<String>,
    pub next_page_url: Option<Url>,
}

/// Parses raw HTML into a `ListingPage` using the `scraper` backend
///
/// # Example
///
/// ```
/// use book_harvest::config::SelectorConfig;
/// use book_harvest::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><body><section><ol class="row">
///   <li><article class="product_pod"><h3><a href="a_1/index.html" title="A">A</a></h3></article></li>
/// </ol><ul class="pager"><li class="next"><a href="page-2.html">next</a></li></ul></section></body></html>"#;
/// let page_url = Url::parse("https://books.toscrape.com/catalogue/page-1.html").unwrap();
/// let page = parse_page(html, &page_url, &SelectorConfig::default()).unwrap();
/// assert_eq!(page.items.len(), 1);
/// assert_eq!(
///     page.next_page_url.unwrap().as_str(),
///     "https://books.toscrape.com/catalogue/page-2.html"
/// );
/// ```
pub fn parse_page(
    html: &str,
    page_url: &Url,
    selectors: &SelectorConfig,
) -> Result<ListingPage, PageParseError> {
    if html.trim().is_empty() {
        return Err(page_error(page_url, "empty response body"));
    }

    let document = ScraperDocument::parse(html);
    parse_listing(&document, page_url, selectors)
}

/// Extracts a `ListingPage` from any queryable document
pub fn parse_listing<D: DocumentQuery>(
    document: &D,
    page_url: &Url,
    selectors: &SelectorConfig,
) -> Result<ListingPage, PageParseError> {
    let root = document.root();
    let query_error = |e: QueryError| page_error(page_url, &e.to_string());

    let items = root
        .select(&selectors.item)
        .map_err(query_error)?
        .iter()
        .enumerate()
        .map(|(index, node)| extract_fragment(index, node, selectors))
        .collect::<Result<Vec<_>, _>>()
        .map_err(query_error)?;

    if items.is_empty() && !root.exists(&selectors.listing_root).map_err(query_error)? {
        return Err(page_error(
            page_url,
            &format!(
                "no items ('{}') and no listing container ('{}') found",
                selectors.item, selectors.listing_root
            ),
        ));
    }

    let category_hint = root
        .first_text(&selectors.category)
        .map_err(query_error)?
        .filter(|text| !text.is_empty());

    let next_page_url = match root
        .first_attr(&selectors.next_page, "href")
        .map_err(query_error)?
    {
        Some(href) => Some(resolve_href(&href, page_url).map_err(|e| {
            page_error(page_url, &format!("unusable next-page link '{}': {}", href, e))
        })?),
        None => None,
    };

    tracing::debug!(
        "Parsed {}: {} item(s), category {:?}, next {:?}",
        page_url,
        items.len(),
        category_hint,
        next_page_url.as_ref().map(Url::as_str)
    );

    Ok(ListingPage {
        items,
        category_hint,
        next_page_url,
    })
}

/// Reads the raw values of one item
fn extract_fragment<N: NodeQuery>(
    index: usize,
    node: &N,
    selectors: &SelectorConfig,
) -> Result<ItemFragment, QueryError> {
    Ok(ItemFragment {
        index,
        title_attr: node.first_attr(&selectors.title, "title")?,
        title_text: node.first_text(&selectors.title)?,
        href: node.first_attr(&selectors.title, "href")?,
        price_text: node.first_text(&selectors.price)?,
        availability_text: node.first_text(&selectors.availability)?,
        rating_class: node.first_attr(&selectors.rating, "class")?,
        image_src: node.first_attr(&selectors.image, "src")?,
    })
}

fn page_error(page_url: &Url, message: &str) -> PageParseError {
    PageParseError {
        url: page_url.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://books.toscrape.com/catalogue/category/books/poetry_23/index.html")
            .unwrap()
    }

    fn pod(href: &str, title: &str, price: &str, rating: &str) -> String {
        format!(
            r#"<li><article class="product_pod">
                <div class="image_container"><a href="{href}"><img src="../../../../media/cache/{href}.jpg" alt="{title}"></a></div>
                <p class="star-rating {rating}"><i class="icon-star"></i></p>
                <h3><a href="{href}" title="{title}">{title}</a></h3>
                <div class="product_price">
                    <p class="price_color">{price}</p>
                    <p class="instock availability"><i class="icon-ok"></i>
                        In stock
                    </p>
                </div>
            </article></li>"#
        )
    }

    fn listing(pods: &[String], breadcrumb: bool, next: Option<&str>) -> String {
        let crumbs = if breadcrumb {
            r#"<ul class="breadcrumb"><li><a href="../../../../index.html">Home</a></li>
               <li><a href="../books_1/index.html">Books</a></li>
               <li><a href="index.html">Poetry</a></li>
               <li class="active">Page 1</li></ul>"#
        } else {
            ""
        };
        let pager = next
            .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#))
            .unwrap_or_default();
        format!(
            "<html><body><div class=\"page_inner\">{crumbs}<section><ol class=\"row\">{}</ol>{pager}</section></div></body></html>",
            pods.join("")
        )
    }

    #[test]
    fn test_items_in_document_order() {
        let html = listing(
            &[
                pod("a_1/index.html", "Alpha", "£10.00", "One"),
                pod("b_2/index.html", "Beta", "£20.00", "Two"),
                pod("c_3/index.html", "Gamma", "£30.00", "Three"),
            ],
            true,
            None,
        );
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();

        let titles: Vec<_> = page
            .items
            .iter()
            .map(|i| i.title_attr.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(page.items[2].index, 2);
    }

    #[test]
    fn test_fragment_fields() {
        let html = listing(&[pod("a_1/index.html", "Alpha", "£51.77", "Three")], true, None);
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        let item = &page.items[0];

        assert_eq!(item.href.as_deref(), Some("a_1/index.html"));
        assert_eq!(item.price_text.as_deref(), Some("£51.77"));
        assert_eq!(item.availability_text.as_deref(), Some("In stock"));
        assert_eq!(item.rating_class.as_deref(), Some("star-rating Three"));
        assert_eq!(
            item.image_src.as_deref(),
            Some("../../../../media/cache/a_1/index.html.jpg")
        );
    }

    #[test]
    fn test_category_hint_from_breadcrumb() {
        let html = listing(&[pod("a_1/index.html", "Alpha", "£1.00", "One")], true, None);
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert_eq!(page.category_hint.as_deref(), Some("Poetry"));
    }

    #[test]
    fn test_missing_breadcrumb_gives_no_hint() {
        let html = listing(&[pod("a_1/index.html", "Alpha", "£1.00", "One")], false, None);
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert_eq!(page.category_hint, None);
    }

    #[test]
    fn test_next_page_resolved_against_page_url() {
        let html = listing(&[pod("a_1/index.html", "Alpha", "£1.00", "One")], true, Some("page-2.html"));
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert_eq!(
            page.next_page_url.unwrap().as_str(),
            "https://books.toscrape.com/catalogue/category/books/poetry_23/page-2.html"
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let html = listing(&[pod("a_1/index.html", "Alpha", "£1.00", "One")], true, None);
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert!(page.next_page_url.is_none());
    }

    #[test]
    fn test_empty_listing_container_is_not_an_error() {
        let html = listing(&[], true, None);
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_unrecognizable_page_is_error() {
        let html = "<html><body><h1>Service temporarily unavailable</h1></body></html>";
        let err = parse_page(html, &page_url(), &SelectorConfig::default()).unwrap_err();
        assert!(err.message.contains("no items"));
        assert_eq!(err.url, page_url().to_string());
    }

    #[test]
    fn test_bare_section_is_not_a_listing() {
        let html = "<html><body><section><h1>Down for maintenance</h1></section></body></html>";
        let err = parse_page(html, &page_url(), &SelectorConfig::default()).unwrap_err();
        assert!(err.message.contains("no items"));
    }

    #[test]
    fn test_empty_body_is_error() {
        let err = parse_page("  \n ", &page_url(), &SelectorConfig::default()).unwrap_err();
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn test_unusable_next_link_is_error() {
        let html = listing(
            &[pod("a_1/index.html", "Alpha", "£1.00", "One")],
            true,
            Some("javascript:void(0)"),
        );
        assert!(parse_page(&html, &page_url(), &SelectorConfig::default()).is_err());
    }

    #[test]
    fn test_malformed_item_still_extracted_as_fragment() {
        let html = listing(
            &[r#"<li><article class="product_pod"><p class="price_color">£3.00</p></article></li>"#
                .to_string()],
            true,
            None,
        );
        let page = parse_page(&html, &page_url(), &SelectorConfig::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title_attr, None);
        assert_eq!(page.items[0].href, None);
    }
}
