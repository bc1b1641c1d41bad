//! Catalog data model shared by the aggregator, token codec and host facade.
//!
//! A `CatalogItem` is what one source reports; a `UnifiedEntry` is the
//! deduplicated record built from one or more items that look like the
//! same title.

mod types;

pub use types::*;
