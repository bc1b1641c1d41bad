use futures::future::join_all;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::dedup::merge_items;
use super::probe::{probe, ProbeOutcome};
use super::{AggregationReport, AggregatorError};
use crate::adapter::{SiteAdapter, SourceRegistry};
use crate::catalog::{CatalogItem, Category, UnifiedEntry};
use crate::config::AggregatorSettings;
use crate::matching::{normalize_title, partial_ratio};
use crate::metrics;

/// Fans catalog and search requests out to every relevant source and merges
/// the answers.
///
/// Sources are queried concurrently but merged in static order: category
/// route order for catalogs, registry order for search.
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    categories: Vec<Category>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        categories: Vec<Category>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            registry,
            categories,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Unified entries for a category. Unknown categories and total source
    /// failure both give an empty list.
    pub async fn list_catalog(&self, category_id: &str) -> Vec<UnifiedEntry> {
        match self.list_catalog_report(category_id).await {
            Ok(report) => report.entries,
            Err(e) => {
                warn!(error = %e, "Catalog listing failed");
                Vec::new()
            }
        }
    }

    /// Like `list_catalog`, with per-source faults and timing.
    pub async fn list_catalog_report(
        &self,
        category_id: &str,
    ) -> Result<AggregationReport, AggregatorError> {
        let category = self
            .category(category_id)
            .ok_or_else(|| AggregatorError::UnknownCategory(category_id.to_string()))?;
        let start = Instant::now();

        // Resolve routes to adapters, keeping route order
        let routes: Vec<(Arc<dyn SiteAdapter>, String)> = category
            .routes
            .iter()
            .filter_map(|route| match self.registry.get(&route.source) {
                Some(adapter) => Some((Arc::clone(adapter), route.locator.clone())),
                None => {
                    warn!(
                        category = %category.id,
                        source = %route.source,
                        "Category routes to unregistered source, skipping"
                    );
                    None
                }
            })
            .collect();

        debug!(
            category = %category.id,
            sources = routes.len(),
            "Starting catalog fan-out"
        );

        let timeout = self.settings.probe_timeout;
        let outcomes = join_all(routes.into_iter().map(|(adapter, locator)| async move {
            let outcome = probe(
                adapter.id(),
                "catalog",
                timeout,
                adapter.fetch_catalog(&locator),
            )
            .await;
            (adapter.id().to_string(), outcome)
        }))
        .await;

        let report = self.assemble(outcomes, start);
        metrics::CATALOG_ENTRIES
            .with_label_values(&["catalog"])
            .observe(report.entries.len() as f64);

        info!(
            category = %category.id,
            entries = report.entries.len(),
            failed_sources = report.source_errors.len(),
            duration_ms = report.duration_ms,
            "Catalog listing complete"
        );

        Ok(report)
    }

    /// Search every registered source that supports search and merge the
    /// hits, best match first.
    pub async fn search(&self, query: &str) -> Vec<UnifiedEntry> {
        self.search_report(query).await.entries
    }

    /// Like `search`, with per-source faults and timing.
    ///
    /// Entries are sorted by descending `partial_ratio` against the
    /// normalized query. The sort is stable and runs after merging, so it
    /// never changes which items were clustered together.
    pub async fn search_report(&self, query: &str) -> AggregationReport {
        let start = Instant::now();
        let searchable: Vec<&Arc<dyn SiteAdapter>> = self
            .registry
            .iter()
            .filter(|adapter| adapter.supports_search())
            .collect();
        debug!(query = %query, sources = searchable.len(), "Starting search fan-out");

        let timeout = self.settings.probe_timeout;
        let outcomes = join_all(searchable.into_iter().map(|adapter| async move {
            let outcome = probe(adapter.id(), "search", timeout, adapter.search(query)).await;
            (adapter.id().to_string(), outcome)
        }))
        .await;

        let mut report = self.assemble(outcomes, start);

        let normalized_query = normalize_title(query);
        report
            .entries
            .sort_by_cached_key(|e| Reverse(partial_ratio(&e.normalized_title, &normalized_query)));

        metrics::CATALOG_ENTRIES
            .with_label_values(&["search"])
            .observe(report.entries.len() as f64);

        info!(
            query = %query,
            entries = report.entries.len(),
            failed_sources = report.source_errors.len(),
            duration_ms = report.duration_ms,
            "Search complete"
        );

        report
    }

    /// Flatten probe outcomes in their static order and merge them.
    fn assemble(
        &self,
        outcomes: Vec<(String, ProbeOutcome<Vec<CatalogItem>>)>,
        start: Instant,
    ) -> AggregationReport {
        let mut all_items: Vec<CatalogItem> = Vec::new();
        let mut source_errors: HashMap<String, String> = HashMap::new();

        for (source_id, outcome) in outcomes {
            match outcome {
                ProbeOutcome::Completed(items) => {
                    // Items are attributed to the adapter that returned them
                    all_items.extend(items.into_iter().map(|mut item| {
                        item.source_id.clone_from(&source_id);
                        item
                    }));
                }
                ProbeOutcome::Faulted(fault) => {
                    source_errors.insert(source_id, fault.to_string());
                }
            }
        }

        let entries = merge_items(all_items, &self.settings.matcher);

        AggregationReport {
            entries,
            source_errors,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
