//! Document query interface
//!
//! The listing parser only ever asks three structural questions: which nodes
//! match a selector, what text does the first match hold, and what is the
//! value of one of its attributes. Those questions are expressed as traits so
//! the extraction logic does not depend on a particular HTML library. The
//! `scraper` crate provides the default implementation.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// A selector the backing HTML library could not compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{0}'")]
pub struct QueryError(pub String);

/// A parsed document that can be queried structurally
pub trait DocumentQuery {
    type Node<'a>: NodeQuery
    where
        Self: 'a;

    /// The document's root element; every query starts here
    fn root(&self) -> Self::Node<'_>;
}

/// Structural queries on one element and its descendants
pub trait NodeQuery: Sized {
    /// All descendants matching `selector`, in document order
    fn select(&self, selector: &str) -> Result<Vec<Self>, QueryError>;

    /// Whitespace-trimmed text content of this element
    fn text(&self) -> String;

    /// Value of attribute `name` on this element
    fn attr(&self, name: &str) -> Option<String>;

    /// Trimmed text of the first descendant matching `selector`
    fn first_text(&self, selector: &str) -> Result<Option<String>, QueryError> {
        Ok(self.select(selector)?.first().map(NodeQuery::text))
    }

    /// Attribute `name` of the first descendant matching `selector`
    fn first_attr(&self, selector: &str, name: &str) -> Result<Option<String>, QueryError> {
        Ok(self.select(selector)?.first().and_then(|node| node.attr(name)))
    }

    /// True if at least one descendant matches `selector`
    fn exists(&self, selector: &str) -> Result<bool, QueryError> {
        Ok(!self.select(selector)?.is_empty())
    }
}

/// `scraper`-backed document
pub struct ScraperDocument {
    html: Html,
}

impl ScraperDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

impl DocumentQuery for ScraperDocument {
    type Node<'a> = ScraperNode<'a>;

    fn root(&self) -> ScraperNode<'_> {
        ScraperNode(self.html.root_element())
    }
}

/// `scraper`-backed element
#[derive(Clone, Copy)]
pub struct ScraperNode<'a>(ElementRef<'a>);

impl<'a> NodeQuery for ScraperNode<'a> {
    fn select(&self, selector: &str) -> Result<Vec<Self>, QueryError> {
        let compiled = Selector::parse(selector).map_err(|_| QueryError(selector.to_string()))?;
        Ok(self.0.select(&compiled).map(ScraperNode).collect())
    }

    fn text(&self) -> String {
        self.0.text().collect::<String>().trim().to_string()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.value().attr(name).map(str::to_string)
    }
}
