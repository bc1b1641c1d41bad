//! Testing utilities and mock implementations.
//!
//! This module provides a mock `SiteAdapter`, allowing the aggregator, the
//! resolver and the hub to be exercised without real sources.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinemux_core::testing::{MockSiteAdapter, fixtures};
//!
//! let alpha = MockSiteAdapter::new("alpha")
//!     .with_catalog("/movies", vec![fixtures::catalog_item("alpha", "Gladiator", "a/1")]);
//! let beta = MockSiteAdapter::new("beta").with_failure(SourceError::Timeout);
//!
//! // Register both, then inspect what each was asked for...
//! ```

mod mock_adapter;

pub use mock_adapter::{MockOperation, MockSiteAdapter, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::adapter::{Details, Episode, StreamLink};
    use crate::catalog::{CatalogItem, Category, CategoryRoute, ContentKind};

    /// Create a movie catalog item with no poster.
    pub fn catalog_item(source_id: &str, title: &str, url: &str) -> CatalogItem {
        CatalogItem::new(title, source_id, url, ContentKind::Movie)
    }

    /// Create a series catalog item.
    pub fn series_item(source_id: &str, title: &str, url: &str) -> CatalogItem {
        CatalogItem::new(title, source_id, url, ContentKind::Series)
    }

    /// Create a stream link labelled with the source id.
    pub fn stream_link(source_id: &str, url: &str) -> StreamLink {
        StreamLink::new(source_id, format!("{} stream", source_id), url)
    }

    pub fn episode(season: u32, episode: u32, url: &str) -> Episode {
        Episode {
            season: Some(season),
            episode: Some(episode),
            name: Some(format!("Episode {}", episode)),
            url: url.to_string(),
        }
    }

    /// Create series details with `seasons` x `episodes` episodes whose
    /// URLs are `{url_prefix}/s{season}e{episode}`.
    pub fn series_details(title: &str, url_prefix: &str, seasons: u32, episodes: u32) -> Details {
        Details {
            title: title.to_string(),
            poster_url: None,
            plot: Some(format!("A series about {}.", title.to_lowercase())),
            episodes: (1..=seasons)
                .flat_map(|s| {
                    (1..=episodes).map(move |e| episode(s, e, &format!("{}/s{}e{}", url_prefix, s, e)))
                })
                .collect(),
        }
    }

    pub fn movie_details(title: &str) -> Details {
        Details {
            title: title.to_string(),
            poster_url: None,
            plot: Some(format!("A movie about {}.", title.to_lowercase())),
            episodes: Vec::new(),
        }
    }

    /// Create a category routed to `(source, locator)` pairs in order.
    pub fn category(id: &str, routes: &[(&str, &str)]) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            routes: routes
                .iter()
                .map(|(source, locator)| CategoryRoute {
                    source: source.to_string(),
                    locator: locator.to_string(),
                })
                .collect(),
        }
    }
}
