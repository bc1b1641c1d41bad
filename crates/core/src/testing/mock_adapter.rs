//! Mock site adapter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::adapter::{Details, SiteAdapter, SourceError, StreamLink};
use crate::catalog::CatalogItem;
use crate::matching::normalize_title;

/// Which adapter operation was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Catalog,
    Details,
    Streams,
    Search,
}

/// A recorded adapter call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: MockOperation,
    /// Locator, URL or query the call was made with.
    pub argument: String,
    pub timestamp: Instant,
}

#[derive(Default)]
struct MockState {
    catalogs: HashMap<String, Vec<CatalogItem>>,
    search_items: Vec<CatalogItem>,
    details: HashMap<String, Details>,
    streams: HashMap<String, Vec<StreamLink>>,
    /// Every call fails with this error while set.
    failure: Option<SourceError>,
    /// Every call sleeps this long before answering.
    delay: Option<Duration>,
    no_search: bool,
    calls: Vec<RecordedCall>,
}

/// Mock implementation of the SiteAdapter trait.
///
/// Provides controllable behavior for testing:
/// - Return configured catalogs, search results, details and streams
/// - Track calls for assertions
/// - Simulate failures and slow sources
///
/// Clones share state, so a test can keep one handle while the registry
/// owns another.
///
/// # Example
///
/// ```rust,ignore
/// use cinemux_core::testing::{MockSiteAdapter, fixtures};
///
/// let alpha = MockSiteAdapter::new("alpha")
///     .with_catalog("/movies", vec![fixtures::catalog_item("alpha", "Gladiator", "a/1")])
///     .with_streams("a/1", vec![fixtures::stream_link("alpha", "https://cdn/a.m3u8")]);
///
/// let registry = SourceRegistry::new().with(Arc::new(alpha.clone()));
/// // ...
/// assert_eq!(alpha.call_count(MockOperation::Streams), 1);
/// ```
#[derive(Clone)]
pub struct MockSiteAdapter {
    id: String,
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockSiteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSiteAdapter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &"<state>")
            .finish()
    }
}

impl MockSiteAdapter {
    /// Create a mock adapter that knows nothing.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Serve `items` for `locator`.
    pub fn with_catalog(self, locator: &str, items: Vec<CatalogItem>) -> Self {
        self.set_catalog(locator, items);
        self
    }

    /// Items searchable by title words.
    pub fn with_search_items(self, items: Vec<CatalogItem>) -> Self {
        self.set_search_items(items);
        self
    }

    pub fn with_details(self, url: &str, details: Details) -> Self {
        self.set_details(url, details);
        self
    }

    pub fn with_streams(self, url: &str, links: Vec<StreamLink>) -> Self {
        self.set_streams(url, links);
        self
    }

    pub fn with_failure(self, error: SourceError) -> Self {
        self.set_failure(Some(error));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    /// Report search as unavailable; `search` then fails with `Unsupported`.
    pub fn without_search(self) -> Self {
        self.state().no_search = true;
        self
    }

    pub fn set_catalog(&self, locator: &str, items: Vec<CatalogItem>) {
        self.state().catalogs.insert(locator.to_string(), items);
    }

    pub fn set_search_items(&self, items: Vec<CatalogItem>) {
        self.state().search_items = items;
    }

    pub fn set_details(&self, url: &str, details: Details) {
        self.state().details.insert(url.to_string(), details);
    }

    pub fn set_streams(&self, url: &str, links: Vec<StreamLink>) {
        self.state().streams.insert(url.to_string(), links);
    }

    /// Make every call fail (or stop failing with `None`).
    pub fn set_failure(&self, error: Option<SourceError>) {
        self.state().failure = error;
    }

    /// Get recorded calls.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Arguments of every call to `operation`, in call order.
    pub fn calls_to(&self, operation: MockOperation) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.argument.clone())
            .collect()
    }

    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }

    pub fn clear_recorded(&self) {
        self.state().calls.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, then apply the configured delay and failure.
    async fn enter(&self, operation: MockOperation, argument: &str) -> Result<(), SourceError> {
        let (delay, failure) = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                operation,
                argument: argument.to_string(),
                timestamp: Instant::now(),
            });
            (state.delay, state.failure.clone())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SiteAdapter for MockSiteAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogItem>, SourceError> {
        self.enter(MockOperation::Catalog, locator).await?;
        Ok(self
            .state()
            .catalogs
            .get(locator)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_details(&self, url: &str) -> Result<Details, SourceError> {
        self.enter(MockOperation::Details, url).await?;
        self.state()
            .details
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::Http {
                status: 404,
                body: format!("no details for {}", url),
            })
    }

    async fn resolve_streams(&self, url: &str) -> Result<Vec<StreamLink>, SourceError> {
        self.enter(MockOperation::Streams, url).await?;
        Ok(self.state().streams.get(url).cloned().unwrap_or_default())
    }

    fn supports_search(&self) -> bool {
        !self.state().no_search
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SourceError> {
        self.enter(MockOperation::Search, query).await?;
        if self.state().no_search {
            return Err(SourceError::Unsupported(format!("{} has no search", self.id)));
        }

        // Default: every query word appears in the normalized title
        let query = normalize_title(query);
        Ok(self
            .state()
            .search_items
            .iter()
            .filter(|item| {
                let title = normalize_title(&item.title);
                query.split_whitespace().all(|word| title.contains(word))
            })
            .cloned()
            .collect())
    }
}
