//! Catalog aggregation integration tests.
//!
//! These tests drive the hub over mock sources:
//! - Category routing and merge order
//! - Fault and timeout isolation
//! - Search ranking
//! - Detail loading and episode tokens

use std::sync::Arc;
use std::time::Duration;

use cinemux_core::{
    testing::{fixtures, MockOperation, MockSiteAdapter},
    AggregatorSettings, Category, ContentKind, ContentToken, Hub, SourceError, SourceRef,
    SourceRegistry,
};

/// Three sources with overlapping movie and series catalogs.
struct TestHarness {
    hub: Hub,
    alpha: MockSiteAdapter,
    beta: MockSiteAdapter,
    gamma: MockSiteAdapter,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_settings(AggregatorSettings::default())
    }

    fn with_settings(settings: AggregatorSettings) -> Self {
        let alpha = MockSiteAdapter::new("alpha")
            .with_name("Alpha")
            .with_catalog(
                "/movies",
                vec![
                    fixtures::catalog_item("alpha", "Gladiator", "https://alpha/m/1"),
                    fixtures::catalog_item("alpha", "Heat", "https://alpha/m/2")
                        .with_poster("https://alpha/heat.jpg"),
                ],
            )
            .with_catalog(
                "/series",
                vec![fixtures::series_item("alpha", "Dark", "https://alpha/s/dark")],
            )
            .with_details(
                "https://alpha/s/dark",
                fixtures::series_details("Dark", "https://alpha/s/dark", 1, 2),
            );

        let beta = MockSiteAdapter::new("beta")
            .with_catalog(
                "/film",
                vec![
                    fixtures::catalog_item("beta", "GLADIATOR", "https://beta/f/9")
                        .with_poster("https://beta/gladiator.jpg"),
                    fixtures::catalog_item("beta", "Gladiator II", "https://beta/f/10"),
                    fixtures::catalog_item("beta", "heat", "https://beta/f/11")
                        .with_poster("https://beta/heat.jpg"),
                ],
            )
            .with_catalog(
                "/tv",
                vec![fixtures::series_item("beta", "Dark!", "https://beta/tv/dark")],
            )
            .with_details(
                "https://beta/tv/dark",
                fixtures::series_details("Dark", "https://beta/tv/dark", 2, 2),
            );

        let gamma = MockSiteAdapter::new("gamma").with_catalog(
            "/cinema",
            vec![fixtures::catalog_item("gamma", "Alien", "https://gamma/c/1")],
        );

        let registry = SourceRegistry::new()
            .with(Arc::new(alpha.clone()))
            .with(Arc::new(beta.clone()))
            .with(Arc::new(gamma.clone()));
        let categories: Vec<Category> = vec![
            fixtures::category(
                "movies",
                &[("alpha", "/movies"), ("beta", "/film"), ("gamma", "/cinema")],
            ),
            fixtures::category("series", &[("beta", "/tv"), ("alpha", "/series")]),
        ];

        Self {
            hub: Hub::new(Arc::new(registry), categories, settings),
            alpha,
            beta,
            gamma,
        }
    }
}

#[tokio::test]
async fn test_movie_catalog_merges_across_sources() {
    let h = TestHarness::new();

    let report = h.hub.aggregator().list_catalog_report("movies").await.unwrap();
    let titles: Vec<&str> = report
        .entries
        .iter()
        .map(|e| e.display_title.as_str())
        .collect();

    assert_eq!(titles, vec!["Gladiator", "Heat", "Gladiator II", "Alien"]);
    assert_eq!(
        report.entries[0].sources,
        vec![
            SourceRef::new("alpha", "https://alpha/m/1"),
            SourceRef::new("beta", "https://beta/f/9"),
        ]
    );
    // Backfilled from beta
    assert_eq!(
        report.entries[0].poster_url.as_deref(),
        Some("https://beta/gladiator.jpg")
    );
    // Kept from alpha
    assert_eq!(
        report.entries[1].poster_url.as_deref(),
        Some("https://alpha/heat.jpg")
    );
    assert!(report.source_errors.is_empty());
}

#[tokio::test]
async fn test_route_order_decides_display_title() {
    let h = TestHarness::new();

    let listings = h.hub.list_catalog("series").await;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].display_title, "Dark!");
    assert_eq!(listings[0].kind, ContentKind::Series);
    let token = ContentToken::decode(&listings[0].token).unwrap();
    assert_eq!(
        token.sources.iter().map(|s| s.source_id.as_str()).collect::<Vec<_>>(),
        vec!["beta", "alpha"]
    );
}

#[tokio::test]
async fn test_catalog_is_stable_when_sources_answer_out_of_order() {
    let h = TestHarness::new();
    let first = h.hub.list_catalog("movies").await;

    // The first routed source now answers last
    let slow = TestHarness::new();
    let alpha = slow.alpha.clone().with_delay(Duration::from_millis(30));
    let registry = SourceRegistry::new()
        .with(Arc::new(alpha))
        .with(Arc::new(slow.beta.clone()))
        .with(Arc::new(slow.gamma.clone()));
    let hub = Hub::new(
        Arc::new(registry),
        slow.hub.categories().to_vec(),
        AggregatorSettings::default(),
    );

    assert_eq!(hub.list_catalog("movies").await, first);
}

#[tokio::test]
async fn test_failed_source_only_loses_its_items() {
    let h = TestHarness::new();
    h.beta
        .set_failure(Some(SourceError::ConnectionFailed("refused".to_string())));

    let report = h.hub.aggregator().list_catalog_report("movies").await.unwrap();

    assert_eq!(report.entries.len(), 3);
    assert!(report.entries.iter().all(|e| !e.has_source("beta")));
    assert_eq!(report.source_errors.len(), 1);
    assert!(report.source_errors["beta"].contains("refused"));
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let h = TestHarness::with_settings(AggregatorSettings {
        probe_timeout: Duration::from_millis(50),
        ..AggregatorSettings::default()
    });
    let gamma = h.gamma.clone().with_delay(Duration::from_secs(10));

    let report = h.hub.aggregator().list_catalog_report("movies").await.unwrap();

    assert_eq!(gamma.call_count(MockOperation::Catalog), 1);
    assert!(report.entries.iter().all(|e| !e.has_source("gamma")));
    assert!(report.source_errors.contains_key("gamma"));
    assert!(report.duration_ms < 10_000);
}

#[tokio::test]
async fn test_unknown_category_lists_nothing() {
    let h = TestHarness::new();

    assert!(h.hub.list_catalog("documentaries").await.is_empty());
    assert_eq!(h.alpha.total_calls(), 0);
}

#[tokio::test]
async fn test_search_ranks_and_merges() {
    let h = TestHarness::new();
    h.alpha.set_search_items(vec![
        fixtures::catalog_item("alpha", "The Gladiator Chronicles", "https://alpha/m/7"),
        fixtures::catalog_item("alpha", "Gladiator", "https://alpha/m/1"),
    ]);
    h.beta.set_search_items(vec![fixtures::catalog_item(
        "beta",
        "Gladiator",
        "https://beta/f/9",
    )]);
    h.gamma
        .set_failure(Some(SourceError::Http {
            status: 503,
            body: "maintenance".to_string(),
        }));

    let report = h.hub.aggregator().search_report("gladiator").await;

    assert_eq!(report.entries.len(), 2);
    assert!(report.entries[1].has_source("alpha") && report.entries[1].has_source("beta"));
    assert!(report.source_errors.contains_key("gamma"));
    assert_eq!(h.beta.calls_to(MockOperation::Search), vec!["gladiator"]);
}

#[tokio::test]
async fn test_details_and_episode_tokens() {
    let h = TestHarness::new();
    let listing = h.hub.list_catalog("series").await.remove(0);

    let details = h.hub.load_details(&listing.token).await.unwrap();

    assert_eq!(details.sources, vec!["beta", "alpha"]);
    // Season 1 from both sources, season 2 only on beta
    assert_eq!(details.episodes.len(), 4);
    let s1e1 = ContentToken::decode(&details.episodes[0].token).unwrap();
    assert_eq!((s1e1.season, s1e1.episode), (Some(1), Some(1)));
    assert_eq!(
        s1e1.sources,
        vec![
            SourceRef::new("beta", "https://beta/tv/dark/s1e1"),
            SourceRef::new("alpha", "https://alpha/s/dark/s1e1"),
        ]
    );
    let s2e2 = ContentToken::decode(&details.episodes[3].token).unwrap();
    assert_eq!(s2e2.sources.len(), 1);
    assert_eq!(s2e2.title.as_deref(), Some("Dark"));
}

#[test]
fn test_catalog_from_blocking_context() {
    let h = TestHarness::new();

    let listings = tokio_test::block_on(h.hub.list_catalog("movies"));

    assert_eq!(listings.len(), 4);
    assert!(listings
        .iter()
        .all(|l| ContentToken::decode(&l.token).is_ok()));
}
