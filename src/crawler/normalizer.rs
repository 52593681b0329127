//! Record normalizer
//!
//! Converts one raw `ItemFragment` into a typed `Book`:
//! - title from the link's `title` attribute, else the link text
//! - price with its leading currency symbol stripped
//! - rating from the second class token
//! - detail URL resolved against the page URL
//! - thumbnail URL resolved against the site base URL
//! - category from the page hint, else `"Default"`
//!
//! Detail links and thumbnails use different bases on purpose: the source
//! markup writes thumbnail paths relative to the site root.

use crate::book::{Book, BookError, Rating, DEFAULT_CATEGORY};
use crate::crawler::error::ItemParseError;
use crate::crawler::parser::ItemFragment;
use crate::url::resolve_href;
use url::Url;

/// Page-level inputs shared by every item on one listing page
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub page_url: Url,
    pub base_url: Url,
    pub category_hint: Option<String>,
}

impl NormalizeContext {
    pub fn normalize(&self, fragment: &ItemFragment) -> Result<Book, ItemParseError> {
        normalize(
            fragment,
            &self.page_url,
            &self.base_url,
            self.category_hint.as_deref(),
        )
    }
}

/// Builds a `Book` from one item fragment
pub fn normalize(
    fragment: &ItemFragment,
    page_url: &Url,
    base_url: &Url,
    category_hint: Option<&str>,
) -> Result<Book, ItemParseError> {
    let title = extract_title(fragment)?;
    let price = parse_price(fragment.price_text.as_deref().ok_or(ItemParseError::MissingPrice)?)?;

    let availability = fragment.availability_text.clone().unwrap_or_default();

    let rating = fragment
        .rating_class
        .as_deref()
        .map(Rating::from_class_list)
        .unwrap_or(Rating::Unknown);

    let href = fragment
        .href
        .as_deref()
        .ok_or(ItemParseError::MissingDetailLink)?;
    let detail_url = resolve_href(href, page_url).map_err(|e| ItemParseError::BadUrl {
        field: "detail",
        message: e.to_string(),
    })?;

    let src = fragment
        .image_src
        .as_deref()
        .ok_or(ItemParseError::MissingThumbnail)?;
    let thumbnail_url = resolve_href(src, base_url).map_err(|e| ItemParseError::BadUrl {
        field: "thumbnail",
        message: e.to_string(),
    })?;

    let category = category_hint
        .map(str::trim)
        .filter(|hint| !hint.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);

    Book::new(
        title,
        price,
        availability,
        rating,
        detail_url,
        thumbnail_url,
        category,
    )
    .map_err(|e| match e {
        BookError::EmptyTitle => ItemParseError::MissingTitle,
        BookError::InvalidPrice(value) => ItemParseError::BadPrice(value.to_string()),
    })
}

/// Title attribute first, link text as a fallback; blank counts as missing
fn extract_title(fragment: &ItemFragment) -> Result<String, ItemParseError> {
    [&fragment.title_attr, &fragment.title_text]
        .into_iter()
        .flatten()
        .map(|t| t.trim())
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(ItemParseError::MissingTitle)
}

/// Parses a currency-prefixed price such as `£51.77`
///
/// Leading symbols (the currency sign, or mis-decoded bytes such as `Â£`) are
/// stripped and thousands separators removed. Letters are never stripped.
/// Whatever remains must be a non-negative decimal number.
pub fn parse_price(text: &str) -> Result<f64, ItemParseError> {
    let bad_price = || ItemParseError::BadPrice(text.to_string());

    let numeric: String = text
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.' && c != '-')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if numeric.is_empty()
        || !numeric
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(bad_price());
    }

    let price: f64 = numeric.parse().map_err(|_| bad_price())?;
    if !price.is_finite() || price < 0.0 {
        return Err(bad_price());
    }

    Ok(price)
}
