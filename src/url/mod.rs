//! URL handling module for Book-Harvest
//!
//! Every URL a `Book` carries must be absolute. This module owns the rules for
//! validating configured site URLs and resolving the relative `href`/`src`
//! values found in listing markup.

mod resolve;

pub use resolve::{parse_site_url, resolve_href, visit_key};
