//! Star rating lexicon
//!
//! Ratings come from the second token of a class list such as
//! `star-rating Three`. Anything outside the five known words is `Unknown`.

use std::fmt;

/// Star rating of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    One,
    Two,
    Three,
    Four,
    Five,
    Unknown,
}

impl Rating {
    /// Maps a rating word to a `Rating`
    ///
    /// Matching is exact: the source markup uses capitalized words.
    pub fn from_token(token: &str) -> Self {
        match token {
            "One" => Self::One,
            "Two" => Self::Two,
            "Three" => Self::Three,
            "Four" => Self::Four,
            "Five" => Self::Five,
            _ => Self::Unknown,
        }
    }

    /// Derives the rating from a whitespace-separated class list
    ///
    /// The second token carries the rating word; a missing second token maps
    /// to `Unknown`.
    pub fn from_class_list(classes: &str) -> Self {
        classes
            .split_whitespace()
            .nth(1)
            .map(Self::from_token)
            .unwrap_or(Self::Unknown)
    }

    /// Number of stars, if known
    pub fn stars(&self) -> Option<u8> {
        match self {
            Self::One => Some(1),
            Self::Two => Some(2),
            Self::Three => Some(3),
            Self::Four => Some(4),
            Self::Five => Some(5),
            Self::Unknown => None,
        }
    }

    /// Converts the rating to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::One => "One",
            Self::Two => "Two",
            Self::Three => "Three",
            Self::Four => "Four",
            Self::Five => "Five",
            Self::Unknown => "Unknown",
        }
    }

    /// Parses a rating from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "Unknown" => Some(Self::Unknown),
            other => match Self::from_token(other) {
                Self::Unknown => None,
                known => Some(known),
            },
        }
    }

    /// Returns all ratings, known ones first
    pub fn all() -> [Self; 6] {
        [
            Self::One,
            Self::Two,
            Self::Three,
            Self::Four,
            Self::Five,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
