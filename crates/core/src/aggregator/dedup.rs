//! Merging of per-source catalog items into unified entries.

use crate::catalog::{CatalogItem, SourceRef, UnifiedEntry};
use crate::matching::{normalize_title, FuzzyMatcher};

/// Merge catalog items into unified entries by fuzzy title.
///
/// Items are taken in sequence order. Each one joins the first existing
/// entry (in creation order) whose frozen `normalized_title` is a strict
/// match, not the best-scoring one, so the result depends only on the input
/// order. Chains are possible: C can join A's entry through B's title only
/// if C's own title matches A's frozen key, never through B's.
///
/// When an item joins an entry:
/// - its source is appended unless the entry already carries that source id
/// - its poster backfills the entry's poster if the entry has none
///
/// Returned entries are in creation order.
pub fn merge_items(
    items: impl IntoIterator<Item = CatalogItem>,
    matcher: &FuzzyMatcher,
) -> Vec<UnifiedEntry> {
    let mut entries: Vec<UnifiedEntry> = Vec::new();

    for item in items {
        let normalized = normalize_title(&item.title);

        match entries
            .iter_mut()
            .find(|e| matcher.is_same_title(&e.normalized_title, &normalized))
        {
            Some(existing) => {
                if !existing.has_source(&item.source_id) {
                    existing
                        .sources
                        .push(SourceRef::new(item.source_id, item.source_url));
                }
                if existing.poster_url.is_none() && item.poster_url.is_some() {
                    existing.poster_url = item.poster_url;
                }
            }
            None => entries.push(UnifiedEntry {
                display_title: item.title,
                normalized_title: normalized,
                poster_url: item.poster_url,
                kind: item.kind,
                sources: vec![SourceRef::new(item.source_id, item.source_url)],
            }),
        }
    }

    entries
}
