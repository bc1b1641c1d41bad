//! Title normalization and fuzzy title comparison.
//!
//! Scores are only meaningful between normalized titles: callers run both
//! sides through [`normalize_title`] before asking the [`FuzzyMatcher`].

mod fuzzy;
mod normalize;

pub use fuzzy::{
    levenshtein_distance, partial_ratio, ratio, FuzzyMatcher, LOOSE_THRESHOLD, STRICT_THRESHOLD,
};
pub use normalize::normalize_title;
