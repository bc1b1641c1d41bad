//! Per-source capability abstraction.
//!
//! Every upstream site is reached through a `SiteAdapter`. Concrete adapters
//! are registered once in a [`SourceRegistry`] and handed to the aggregator
//! and resolver; nothing branches on site names.

mod html;
mod registry;
mod types;

pub use html::HtmlSiteAdapter;
pub(crate) use html::SelectorSet;
pub use registry::SourceRegistry;
pub use types::*;

use async_trait::async_trait;

use crate::catalog::CatalogItem;

/// One upstream content source.
///
/// Implementations must be safe to call concurrently; any session state
/// (cookies, challenge tokens) stays private to the adapter.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Stable id used in tokens and config routes.
    fn id(&self) -> &str;

    /// Human-readable name, used as the stream source label.
    fn name(&self) -> &str {
        self.id()
    }

    /// List the items of one category page.
    async fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogItem>, SourceError>;

    /// Load an item page: title, poster, plot and episodes.
    async fn fetch_details(&self, url: &str) -> Result<Details, SourceError>;

    /// Find playable stream URLs for an item or episode page.
    async fn resolve_streams(&self, url: &str) -> Result<Vec<StreamLink>, SourceError>;

    /// Whether `search` is available. Sources that cannot search are left
    /// out of search fan-outs instead of being probed and failing.
    fn supports_search(&self) -> bool {
        true
    }

    /// Free-text search.
    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SourceError>;
}
