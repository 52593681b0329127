//! Book records
//!
//! A `Book` is the unit of persistence and the crawl's output record. Its
//! fields are private so the invariants hold for every instance:
//! - `title` is non-empty
//! - `price` is finite and non-negative
//! - `in_stock` always agrees with `availability`
//! - `detail_url` and `thumbnail_url` are absolute

mod rating;

pub use rating::Rating;

use thiserror::Error;
use url::Url;

/// Phrase in the availability text that marks a book as in stock
pub const IN_STOCK_MARKER: &str = "In stock";

/// Category used when a listing page carries no category breadcrumb
pub const DEFAULT_CATEGORY: &str = "Default";

/// Errors raised when a `Book` would violate its invariants
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookError {
    #[error("title is empty")]
    EmptyTitle,

    #[error("price {0} is not a finite non-negative amount")]
    InvalidPrice(f64),
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    title: String,
    price: f64,
    availability: String,
    in_stock: bool,
    rating: Rating,
    detail_url: Url,
    thumbnail_url: Url,
    category: String,
}

impl Book {
    /// Builds a book, deriving `in_stock` from the availability text
    ///
    /// A blank `category` falls back to [`DEFAULT_CATEGORY`].
    pub fn new(
        title: impl Into<String>,
        price: f64,
        availability: impl Into<String>,
        rating: Rating,
        detail_url: Url,
        thumbnail_url: Url,
        category: impl Into<String>,
    ) -> Result<Self, BookError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(BookError::EmptyTitle);
        }

        if !price.is_finite() || price < 0.0 {
            return Err(BookError::InvalidPrice(price));
        }

        let availability = availability.into();
        let in_stock = is_in_stock(&availability);

        let category = category.into().trim().to_string();
        let category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category
        };

        Ok(Self {
            title,
            price,
            availability,
            in_stock,
            rating,
            detail_url,
            thumbnail_url,
            category,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Raw stock phrase, kept verbatim for display
    pub fn availability(&self) -> &str {
        &self.availability
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn detail_url(&self) -> &Url {
        &self.detail_url
    }

    pub fn thumbnail_url(&self) -> &Url {
        &self.thumbnail_url
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// A book as persisted, keyed by its opaque storage identifier
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBook {
    pub id: i64,
    pub book: Book,
}

/// Stock derivation shared by every code path that builds a `Book`
///
/// Case-sensitive, as the source markup writes it.
pub fn is_in_stock(availability: &str) -> bool {
    availability.contains(IN_STOCK_MARKER)
}
