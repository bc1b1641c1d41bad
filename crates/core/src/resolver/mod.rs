//! Resolution of a content token to playable stream links.

use futures::future::{join, join_all};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::{SiteAdapter, SourceError, SourceRegistry, StreamLink};
use crate::aggregator::probe;
use crate::config::AggregatorSettings;
use crate::matching::normalize_title;
use crate::metrics;
use crate::token::ContentToken;

/// Resolves stream links for a token from every source known to carry it,
/// plus any other source whose search finds the same title.
///
/// Links are handed to `emit` as each source answers, in no particular
/// order. A failing or slow source only loses its own links.
pub struct LinkResolver {
    registry: Arc<SourceRegistry>,
    settings: AggregatorSettings,
}

impl LinkResolver {
    pub fn new(registry: Arc<SourceRegistry>, settings: AggregatorSettings) -> Self {
        Self { registry, settings }
    }

    /// Resolve `token`, calling `emit` once per link found.
    ///
    /// 1. Every source in the token is asked for streams at its URL.
    /// 2. If the token title is long enough, every other registered source
    ///    that can search is searched for it; the first loose match is resolved the same
    ///    way. For an episode token the matched title's episode list must
    ///    contain the exact season and episode, or the source is skipped.
    ///
    /// Both steps run concurrently. Returns whether anything was emitted.
    pub async fn resolve<F>(&self, token: &ContentToken, emit: F) -> bool
    where
        F: Fn(StreamLink) + Send + Sync,
    {
        let start = Instant::now();
        let emitted = AtomicBool::new(false);
        let count = AtomicUsize::new(0);
        let sink = Sink {
            emit: &emit,
            emitted: &emitted,
            count: &count,
        };

        let direct = join_all(token.sources.iter().filter_map(|source| {
            match self.registry.get(&source.source_id) {
                Some(adapter) => Some(self.resolve_direct(adapter, &source.url, &sink)),
                None => {
                    warn!(source = %source.source_id, "Token names unregistered source, skipping");
                    None
                }
            }
        }));

        let cross_title = token.title.as_deref().filter(|title| {
            title.trim().chars().count() >= self.settings.min_cross_search_title_len
        });
        let candidates: Vec<(&Arc<dyn SiteAdapter>, &str)> = match cross_title {
            Some(title) => self
                .registry
                .iter()
                .filter(|adapter| token.url_for(adapter.id()).is_none())
                .filter(|adapter| adapter.supports_search())
                .map(|adapter| (adapter, title))
                .collect(),
            None => Vec::new(),
        };
        let cross = join_all(
            candidates
                .into_iter()
                .map(|(adapter, title)| self.resolve_cross(adapter, title, token, &sink)),
        );

        join(direct, cross).await;

        let emitted = emitted.load(Ordering::SeqCst);
        info!(
            links = count.load(Ordering::SeqCst),
            emitted = emitted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Link resolution complete"
        );
        emitted
    }

    async fn resolve_direct<F>(&self, adapter: &Arc<dyn SiteAdapter>, url: &str, sink: &Sink<'_, F>)
    where
        F: Fn(StreamLink) + Send + Sync,
    {
        let links = probe(
            adapter.id(),
            "streams",
            self.settings.probe_timeout,
            adapter.resolve_streams(url),
        )
        .await
        .unwrap_or_empty();
        sink.push(adapter.id(), links);
    }

    /// Search `adapter` for `title` and resolve the first loose match.
    ///
    /// The search, episode lookup and stream calls share one
    /// `probe_timeout` ceiling.
    async fn resolve_cross<F>(
        &self,
        adapter: &Arc<dyn SiteAdapter>,
        title: &str,
        token: &ContentToken,
        sink: &Sink<'_, F>,
    ) where
        F: Fn(StreamLink) + Send + Sync,
    {
        let id = adapter.id();
        let matcher = self.settings.matcher;

        let chain = async {
            let wanted = normalize_title(title);
            let hits = adapter.search(title).await?;
            let Some(hit) = hits
                .into_iter()
                .find(|item| matcher.is_probable_match(&normalize_title(&item.title), &wanted))
            else {
                debug!(source = %id, title = %title, "No cross-source match");
                return Ok::<_, SourceError>(Vec::new());
            };
            debug!(source = %id, matched = %hit.title, "Cross-source match");

            let url = if token.is_episode() {
                let details = adapter.fetch_details(&hit.source_url).await?;
                match details
                    .episodes
                    .into_iter()
                    .find(|ep| ep.is_numbered(token.season, token.episode))
                {
                    Some(ep) => ep.url,
                    None => {
                        debug!(
                            source = %id,
                            season = ?token.season,
                            episode = ?token.episode,
                            "Matched title lacks the episode"
                        );
                        return Ok(Vec::new());
                    }
                }
            } else {
                hit.source_url
            };

            adapter.resolve_streams(&url).await
        };

        let links = probe(id, "cross", self.settings.probe_timeout, chain)
            .await
            .unwrap_or_empty();
        sink.push(id, links);
    }
}

/// Where probes hand their links; shared by all probes of one resolution.
struct Sink<'a, F> {
    emit: &'a F,
    emitted: &'a AtomicBool,
    count: &'a AtomicUsize,
}

impl<F> Sink<'_, F>
where
    F: Fn(StreamLink) + Send + Sync,
{
    fn push(&self, source_id: &str, links: Vec<StreamLink>) {
        if links.is_empty() {
            return;
        }
        metrics::STREAMS_EMITTED
            .with_label_values(&[source_id])
            .inc_by(links.len() as u64);
        self.count.fetch_add(links.len(), Ordering::SeqCst);
        for link in links {
            (self.emit)(link);
        }
        self.emitted.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceRef;
    use crate::testing::{fixtures, MockOperation, MockSiteAdapter};
    use std::sync::Mutex;
    use std::time::Duration;

    fn resolver(adapters: &[&MockSiteAdapter]) -> LinkResolver {
        let mut registry = SourceRegistry::new();
        for adapter in adapters {
            registry.register(Arc::new((*adapter).clone()));
        }
        LinkResolver::new(Arc::new(registry), AggregatorSettings::default())
    }

    fn token(sources: &[(&str, &str)], title: Option<&str>) -> ContentToken {
        ContentToken {
            sources: sources.iter().map(|(id, url)| SourceRef::new(*id, *url)).collect(),
            title: title.map(str::to_string),
            season: None,
            episode: None,
        }
    }

    async fn collect(resolver: &LinkResolver, token: &ContentToken) -> (bool, Vec<String>) {
        let links = Mutex::new(Vec::new());
        let found = resolver
            .resolve(token, |link| links.lock().unwrap().push(link.url))
            .await;
        let mut links = links.into_inner().unwrap();
        links.sort();
        (found, links)
    }

    #[tokio::test]
    async fn test_direct_sources_resolved() {
        let s1 = MockSiteAdapter::new("Source1")
            .with_streams("s1/x", vec![fixtures::stream_link("Source1", "https://cdn1/x.m3u8")]);
        let s2 = MockSiteAdapter::new("Source2")
            .with_streams("s2/y", vec![fixtures::stream_link("Source2", "https://cdn2/y.mp4")]);
        let r = resolver(&[&s1, &s2]);

        let (found, links) =
            collect(&r, &token(&[("Source1", "s1/x"), ("Source2", "s2/y")], None)).await;

        assert!(found);
        assert_eq!(links, vec!["https://cdn1/x.m3u8", "https://cdn2/y.mp4"]);
    }

    #[tokio::test]
    async fn test_cross_source_fallback() {
        let s1 = MockSiteAdapter::new("Source1")
            .with_streams("s1/x", vec![fixtures::stream_link("Source1", "https://cdn1/x.m3u8")]);
        let s2 = MockSiteAdapter::new("Source2")
            .with_search_items(vec![fixtures::catalog_item("Source2", "Gladiator (2000)", "s2/g")])
            .with_streams("s2/g", vec![fixtures::stream_link("Source2", "https://cdn2/g.mp4")]);
        let r = resolver(&[&s1, &s2]);

        let (found, links) = collect(&r, &token(&[("Source1", "s1/x")], Some("Gladiator"))).await;

        assert!(found);
        assert_eq!(s2.calls_to(MockOperation::Search), vec!["Gladiator"]);
        assert_eq!(s2.calls_to(MockOperation::Streams), vec!["s2/g"]);
        assert_eq!(links, vec!["https://cdn1/x.m3u8", "https://cdn2/g.mp4"]);
        // Sources already in the token are not searched
        assert_eq!(s1.call_count(MockOperation::Search), 0);
    }

    #[tokio::test]
    async fn test_short_title_skips_cross_search() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2")
            .with_search_items(vec![fixtures::catalog_item("Source2", "Ok", "s2/ok")]);
        let r = resolver(&[&s1, &s2]);

        let (found, _) = collect(&r, &token(&[("Source1", "s1/ok")], Some("Ok"))).await;

        assert!(!found);
        assert_eq!(s1.total_calls(), 1);
        assert_eq!(s2.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cross_search_takes_first_loose_match() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2").with_search_items(vec![
            fixtures::catalog_item("Source2", "Heat of the Gladiator", "s2/weak"),
            fixtures::catalog_item("Source2", "Gladiator Heat", "s2/strong"),
            fixtures::catalog_item("Source2", "Gladiator Heat (1999)", "s2/later"),
        ]);
        let r = resolver(&[&s1, &s2]);

        collect(&r, &token(&[("Source1", "s1/x")], Some("Gladiator Heat"))).await;

        assert_eq!(s2.calls_to(MockOperation::Streams), vec!["s2/strong"]);
    }

    #[tokio::test]
    async fn test_cross_search_without_match_resolves_nothing() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2").with_search_items(vec![fixtures::catalog_item(
            "Source2",
            "Heat of the Gladiator",
            "s2/weak",
        )]);
        let r = resolver(&[&s1, &s2]);

        let (found, _) = collect(&r, &token(&[("Source1", "s1/x")], Some("Gladiator Heat"))).await;

        assert!(!found);
        assert_eq!(s2.call_count(MockOperation::Search), 1);
        assert_eq!(s2.call_count(MockOperation::Streams), 0);
    }

    #[tokio::test]
    async fn test_cross_source_episode_lookup() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2")
            .with_search_items(vec![fixtures::series_item("Source2", "Dark", "s2/dark")])
            .with_details("s2/dark", fixtures::series_details("Dark", "s2/dark", 2, 3))
            .with_streams(
                "s2/dark/s2e3",
                vec![fixtures::stream_link("Source2", "https://cdn2/dark-s2e3.m3u8")],
            );
        let r = resolver(&[&s1, &s2]);
        let t = token(&[("Source1", "s1/dark/2x3")], Some("Dark")).with_episode(Some(2), Some(3));

        let (found, links) = collect(&r, &t).await;

        assert!(found);
        assert_eq!(links, vec!["https://cdn2/dark-s2e3.m3u8"]);
        assert_eq!(s2.calls_to(MockOperation::Details), vec!["s2/dark"]);
    }

    #[tokio::test]
    async fn test_cross_source_missing_episode_contributes_nothing() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2")
            .with_search_items(vec![fixtures::series_item("Source2", "Dark", "s2/dark")])
            .with_details("s2/dark", fixtures::series_details("Dark", "s2/dark", 1, 3));
        let r = resolver(&[&s1, &s2]);
        let t = token(&[("Source1", "s1/x")], Some("Dark")).with_episode(Some(3), Some(1));

        let (found, _) = collect(&r, &t).await;

        assert!(!found);
        assert_eq!(s2.call_count(MockOperation::Streams), 0);
    }

    #[tokio::test]
    async fn test_cross_source_chain_shares_one_ceiling() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2")
            .with_delay(Duration::from_millis(40))
            .with_search_items(vec![fixtures::series_item("Source2", "Dark", "s2/dark")])
            .with_details("s2/dark", fixtures::series_details("Dark", "s2/dark", 1, 2))
            .with_streams(
                "s2/dark/s1e2",
                vec![fixtures::stream_link("Source2", "https://cdn2/dark-s1e2.m3u8")],
            );
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(s1)).register(Arc::new(s2.clone()));
        let settings = AggregatorSettings {
            probe_timeout: Duration::from_millis(50),
            ..AggregatorSettings::default()
        };
        let r = LinkResolver::new(Arc::new(registry), settings);
        let t = token(&[("Source1", "s1/x")], Some("Dark")).with_episode(Some(1), Some(2));

        let (found, links) = collect(&r, &t).await;

        // Search and details alone take 80ms, past the 50ms ceiling
        assert!(!found);
        assert!(links.is_empty());
        assert_eq!(s2.call_count(MockOperation::Streams), 0);
    }

    #[tokio::test]
    async fn test_sources_without_search_not_cross_searched() {
        let s1 = MockSiteAdapter::new("Source1");
        let s2 = MockSiteAdapter::new("Source2")
            .without_search()
            .with_search_items(vec![fixtures::catalog_item("Source2", "Gladiator", "s2/g")]);
        let r = resolver(&[&s1, &s2]);

        let (found, _) = collect(&r, &token(&[("Source1", "s1/x")], Some("Gladiator"))).await;

        assert!(!found);
        assert_eq!(s2.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_source_isolated() {
        let s1 = MockSiteAdapter::new("Source1").with_failure(SourceError::Timeout);
        let s2 = MockSiteAdapter::new("Source2")
            .with_streams("s2/y", vec![fixtures::stream_link("Source2", "https://cdn2/y.mp4")]);
        let s3 = MockSiteAdapter::new("Source3")
            .with_delay(Duration::from_secs(5))
            .with_streams("s3/z", vec![fixtures::stream_link("Source3", "https://cdn3/z.mp4")]);
        let mut registry = SourceRegistry::new();
        registry
            .register(Arc::new(s1))
            .register(Arc::new(s2))
            .register(Arc::new(s3));
        let settings = AggregatorSettings {
            probe_timeout: Duration::from_millis(50),
            ..AggregatorSettings::default()
        };
        let r = LinkResolver::new(Arc::new(registry), settings);

        let (found, links) = collect(
            &r,
            &token(&[("Source1", "s1/x"), ("Source2", "s2/y"), ("Source3", "s3/z")], None),
        )
        .await;

        assert!(found);
        assert_eq!(links, vec!["https://cdn2/y.mp4"]);
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let s1 = MockSiteAdapter::new("Source1");
        let r = resolver(&[&s1]);

        let (found, links) = collect(&r, &token(&[("Source1", "s1/x"), ("ghost", "g/1")], None)).await;

        assert!(!found);
        assert!(links.is_empty());
    }
}
