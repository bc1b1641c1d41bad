use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::{Category, ContentKind};
use crate::matching::{FuzzyMatcher, LOOSE_THRESHOLD, STRICT_THRESHOLD};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Fan-out and matching settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    /// Ceiling for any single source call, in seconds (default: 15)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Minimum score to merge two titles (default: 85)
    #[serde(default = "default_strict_threshold")]
    pub strict_threshold: u8,
    /// Minimum score for cross-source lookups (default: 65)
    #[serde(default = "default_loose_threshold")]
    pub loose_threshold: u8,
    /// Titles shorter than this are not cross-searched (default: 3)
    #[serde(default = "default_min_title_len")]
    pub min_cross_search_title_len: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            strict_threshold: default_strict_threshold(),
            loose_threshold: default_loose_threshold(),
            min_cross_search_title_len: default_min_title_len(),
        }
    }
}

fn default_probe_timeout() -> u64 {
    15
}

fn default_strict_threshold() -> u8 {
    STRICT_THRESHOLD
}

fn default_loose_threshold() -> u8 {
    LOOSE_THRESHOLD
}

fn default_min_title_len() -> usize {
    3
}

/// Runtime settings derived from `AggregatorConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorSettings {
    pub probe_timeout: Duration,
    pub matcher: FuzzyMatcher,
    pub min_cross_search_title_len: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from(&AggregatorConfig::default())
    }
}

impl From<&AggregatorConfig> for AggregatorSettings {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            matcher: FuzzyMatcher::new(config.strict_threshold, config.loose_threshold),
            min_cross_search_title_len: config.min_cross_search_title_len,
        }
    }
}

/// One scraped source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Id used in tokens and category routes
    pub id: String,
    /// Display name (defaults to id)
    #[serde(default)]
    pub name: Option<String>,
    /// Site root, e.g. "https://example.org"
    pub base_url: String,
    /// Search path with a `{query}` placeholder; search is unsupported when absent
    #[serde(default)]
    pub search_path: Option<String>,
    /// HTTP request timeout in seconds (default: 15)
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Kind assigned to scraped items (default: movie)
    #[serde(default)]
    pub default_kind: ContentKind,
    /// Embed pages followed per stream lookup (default: 4)
    #[serde(default = "default_max_embeds")]
    pub max_embeds: usize,
    pub selectors: SelectorConfig,
    /// Regular expression matching playable stream URLs in page text,
    /// attribute values and inline scripts
    #[serde(default = "default_stream_pattern")]
    pub stream_pattern: String,
}

impl SourceConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn default_source_timeout() -> u64 {
    15
}

fn default_max_embeds() -> usize {
    4
}

/// CSS selectors used to scrape a source.
///
/// Value fields take `"css"` for the text of the first matching element,
/// `"css@attr"` for one of its attributes, or `"@attr"` for an attribute
/// of the enclosing item or episode element itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorConfig {
    /// One element per catalog or search item
    pub item: String,
    /// Item page URL (default: `@href`)
    #[serde(default = "default_href")]
    pub item_url: String,
    /// Item title (default: the item's text)
    #[serde(default)]
    pub item_title: Option<String>,
    #[serde(default)]
    pub item_poster: Option<String>,
    /// Detail page title (default: the `<title>` element)
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    /// One element per episode on a detail page
    #[serde(default)]
    pub episode: Option<String>,
    /// Episode page URL (default: `@href`)
    #[serde(default = "default_href")]
    pub episode_url: String,
    /// Season number; the first number in the value is used
    #[serde(default)]
    pub episode_season: Option<String>,
    /// Episode number; the first number in the value is used
    #[serde(default)]
    pub episode_number: Option<String>,
    /// Episode name (default: the episode's text)
    #[serde(default)]
    pub episode_name: Option<String>,
    /// Embedded player pages followed for streams, e.g. `iframe@src`
    #[serde(default)]
    pub embed: Option<String>,
}

fn default_href() -> String {
    "@href".to_string()
}

fn default_title() -> String {
    "title".to_string()
}

/// Default stream pattern: absolute `.m3u8` or `.mp4` URLs.
pub fn default_stream_pattern() -> String {
    r#"https?://[^\s"'<>]+?\.(?:m3u8|mp4)(?:\?[^\s"'<>]*)?"#.to_string()
}
