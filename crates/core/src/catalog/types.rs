//! Types for catalog entries as seen from one source and after merging.

use serde::{Deserialize, Serialize};

/// What kind of content a catalog entry is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Movie,
    Series,
    Live,
}

/// One entry as scraped from a single source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    /// Raw title as the source shows it.
    pub title: String,
    /// Id of the adapter that produced this item.
    pub source_id: String,
    /// Source-specific locator for the item page.
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    pub kind: ContentKind,
}

impl CatalogItem {
    /// Build an item with no poster.
    pub fn new(
        title: impl Into<String>,
        source_id: impl Into<String>,
        source_url: impl Into<String>,
        kind: ContentKind,
    ) -> Self {
        Self {
            title: title.into(),
            source_id: source_id.into(),
            source_url: source_url.into(),
            poster_url: None,
            kind,
        }
    }

    /// Attach a poster URL.
    pub fn with_poster(mut self, poster_url: impl Into<String>) -> Self {
        self.poster_url = Some(poster_url.into());
        self
    }
}

/// A `(source id, url)` pair backing a merged entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub source_id: String,
    pub url: String,
}

impl SourceRef {
    pub fn new(source_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
        }
    }
}

/// A deduplicated catalog entry merged from one or more `CatalogItem`s.
///
/// `sources` is never empty and holds at most one URL per source id.
/// `normalized_title` is computed from the first contributing item and is
/// the key later items are compared against; it is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnifiedEntry {
    pub display_title: String,
    pub normalized_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    pub kind: ContentKind,
    pub sources: Vec<SourceRef>,
}

impl UnifiedEntry {
    /// Whether this entry already carries a URL from `source_id`.
    pub fn has_source(&self, source_id: &str) -> bool {
        self.sources.iter().any(|s| s.source_id == source_id)
    }

    /// Source ids contributing to this entry, in merge order.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source_id.as_str())
    }
}

/// Where a category is served from on one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRoute {
    /// Adapter id.
    pub source: String,
    /// Source-specific category locator (path or absolute URL).
    pub locator: String,
}

/// A browsable catalog section with its static per-source routing.
///
/// Route order is the merge order for the category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub routes: Vec<CategoryRoute>,
}

/// A catalog row as handed to the host: what to show plus the opaque token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub display_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    pub kind: ContentKind,
    pub token: String,
}
