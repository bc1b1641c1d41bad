use std::sync::Arc;

use super::SiteAdapter;

/// Ordered list of adapters, built once at startup.
///
/// Registration order is the order sources are queried and merged in when
/// no category routing applies.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("adapters", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter. A later adapter with an already registered id is
    /// ignored.
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) -> &mut Self {
        if self.get(adapter.id()).is_some() {
            tracing::warn!(source = %adapter.id(), "Duplicate source id, ignoring adapter");
        } else {
            self.adapters.push(adapter);
        }
        self
    }

    /// Builder-style `register`.
    pub fn with(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SiteAdapter>> {
        self.adapters.iter().find(|a| a.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteAdapter>> {
        self.adapters.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.id())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSiteAdapter;

    #[test]
    fn test_register_keeps_order() {
        let registry = SourceRegistry::new()
            .with(Arc::new(MockSiteAdapter::new("beta")))
            .with(Arc::new(MockSiteAdapter::new("alpha")));

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["beta", "alpha"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_id_ignored() {
        let mut registry = SourceRegistry::new();
        registry
            .register(Arc::new(MockSiteAdapter::new("alpha")))
            .register(Arc::new(MockSiteAdapter::new("alpha")));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let registry = SourceRegistry::new().with(Arc::new(MockSiteAdapter::new("alpha")));

        assert!(registry.get("alpha").is_some());
        assert!(registry.get("beta").is_none());
        assert!(!registry.is_empty());
    }
}
