//! Host-facing entry points.
//!
//! A host lists catalogs or searches, shows the returned listings, and hands
//! a listing's token back to `load_details` or `resolve`. Tokens are plain
//! strings here; decoding failures are logged and reported as "nothing".

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapter::{Details, HtmlSiteAdapter, SourceError, SourceRegistry, StreamLink};
use crate::aggregator::{probe, Aggregator};
use crate::catalog::{Category, Listing, SourceRef, UnifiedEntry};
use crate::config::{validate_config, AggregatorSettings, Config, ConfigError};
use crate::resolver::LinkResolver;
use crate::token::ContentToken;

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build source {id}: {source}")]
    Source {
        id: String,
        #[source]
        source: SourceError,
    },
}

/// An item page merged across the sources in its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetails {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Sources that answered, in token order.
    pub sources: Vec<String>,
    #[serde(default)]
    pub episodes: Vec<EpisodeListing>,
}

/// One episode with its own resolvable token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source ids carrying this episode.
    pub sources: Vec<String>,
    pub token: String,
}

impl From<&UnifiedEntry> for Listing {
    fn from(entry: &UnifiedEntry) -> Self {
        Listing {
            display_title: entry.display_title.clone(),
            poster_url: entry.poster_url.clone(),
            kind: entry.kind,
            token: ContentToken::from_entry(entry).encode(),
        }
    }
}

/// Catalog aggregation and link resolution over one set of sources.
pub struct Hub {
    aggregator: Aggregator,
    resolver: LinkResolver,
}

impl Hub {
    pub fn new(
        registry: Arc<SourceRegistry>,
        categories: Vec<Category>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            resolver: LinkResolver::new(Arc::clone(&registry), settings),
            aggregator: Aggregator::new(registry, categories, settings),
        }
    }

    /// Validate `config` and build one `HtmlSiteAdapter` per source, in
    /// config order.
    pub fn from_config(config: &Config) -> Result<Self, HubError> {
        validate_config(config)?;

        let mut registry = SourceRegistry::new();
        for source in &config.sources {
            let adapter = HtmlSiteAdapter::new(source).map_err(|e| HubError::Source {
                id: source.id.clone(),
                source: e,
            })?;
            registry.register(Arc::new(adapter));
        }

        info!(
            sources = registry.len(),
            categories = config.categories.len(),
            "Hub initialized"
        );

        Ok(Self::new(
            Arc::new(registry),
            config.categories.clone(),
            AggregatorSettings::from(&config.aggregator),
        ))
    }

    pub fn categories(&self) -> &[Category] {
        self.aggregator.categories()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    /// Listings for a category; empty for an unknown category.
    pub async fn list_catalog(&self, category_id: &str) -> Vec<Listing> {
        self.aggregator
            .list_catalog(category_id)
            .await
            .iter()
            .map(Listing::from)
            .collect()
    }

    pub async fn search(&self, query: &str) -> Vec<Listing> {
        self.aggregator
            .search(query)
            .await
            .iter()
            .map(Listing::from)
            .collect()
    }

    /// Load an entry's details from every source in its token.
    ///
    /// Title comes from the first source (in token order) that answered,
    /// poster and plot from the first that has one. Episodes are merged by
    /// exact `(season, episode)` in first-seen order; unnumbered episodes
    /// stay separate. Returns `None` for a malformed token or when no source
    /// answered.
    pub async fn load_details(&self, token: &str) -> Option<EntryDetails> {
        let token = match ContentToken::decode(token) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Malformed token");
                return None;
            }
        };

        let registry = self.aggregator.registry();
        let timeout = self.aggregator.settings().probe_timeout;
        let answers: Vec<(String, Details)> = join_all(token.sources.iter().filter_map(|source| {
            let adapter = registry.get(&source.source_id)?;
            Some(async move {
                probe(adapter.id(), "details", timeout, adapter.fetch_details(&source.url))
                    .await
                    .ok()
                    .map(|details| (source.source_id.clone(), details))
            })
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        let Some((_, first)) = answers.first() else {
            warn!(sources = token.sources.len(), "No source returned details");
            return None;
        };

        let title = if first.title.trim().is_empty() {
            token.title.clone().unwrap_or_default()
        } else {
            first.title.clone()
        };
        let poster_url = answers.iter().find_map(|(_, d)| d.poster_url.clone());
        let plot = answers.iter().find_map(|(_, d)| d.plot.clone());
        let episodes = merge_episodes(&answers, &title);

        Some(EntryDetails {
            sources: answers.iter().map(|(id, _)| id.clone()).collect(),
            title,
            poster_url,
            plot,
            episodes,
        })
    }

    /// Resolve a token string; `false` when it is malformed or nothing was
    /// found.
    pub async fn resolve<F>(&self, token: &str, emit: F) -> bool
    where
        F: Fn(StreamLink) + Send + Sync,
    {
        match ContentToken::decode(token) {
            Ok(token) => self.resolver.resolve(&token, emit).await,
            Err(e) => {
                warn!(error = %e, "Malformed token");
                false
            }
        }
    }
}

struct MergedEpisode {
    season: Option<u32>,
    episode: Option<u32>,
    name: Option<String>,
    sources: Vec<SourceRef>,
}

fn merge_episodes(answers: &[(String, Details)], title: &str) -> Vec<EpisodeListing> {
    let mut merged: Vec<MergedEpisode> = Vec::new();
    let mut by_number: HashMap<(Option<u32>, Option<u32>), usize> = HashMap::new();

    for (source_id, details) in answers {
        for ep in &details.episodes {
            let source = SourceRef::new(source_id.clone(), ep.url.clone());
            let numbered = ep.season.is_some() || ep.episode.is_some();

            if numbered {
                if let Some(&idx) = by_number.get(&(ep.season, ep.episode)) {
                    let existing = &mut merged[idx];
                    if !existing.sources.iter().any(|s| s.source_id == *source_id) {
                        existing.sources.push(source);
                    }
                    if existing.name.is_none() {
                        existing.name.clone_from(&ep.name);
                    }
                    continue;
                }
                by_number.insert((ep.season, ep.episode), merged.len());
            }

            merged.push(MergedEpisode {
                season: ep.season,
                episode: ep.episode,
                name: ep.name.clone(),
                sources: vec![source],
            });
        }
    }

    merged
        .into_iter()
        .map(|ep| {
            let token = ContentToken {
                title: Some(title.to_string()),
                season: ep.season,
                episode: ep.episode,
                sources: ep.sources,
            };
            EpisodeListing {
                season: ep.season,
                episode: ep.episode,
                name: ep.name,
                sources: token.sources.iter().map(|s| s.source_id.clone()).collect(),
                token: token.encode(),
            }
        })
        .collect()
}
