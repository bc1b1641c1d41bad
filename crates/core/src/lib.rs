pub mod adapter;
pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod hub;
pub mod matching;
pub mod metrics;
pub mod resolver;
pub mod testing;
pub mod token;

pub use adapter::{
    Details, Episode, HtmlSiteAdapter, SiteAdapter, SourceError, SourceRegistry, StreamLink,
};
pub use aggregator::{
    merge_items, probe, AggregationReport, Aggregator, AggregatorError, ProbeOutcome, SourceFault,
};
pub use catalog::{
    CatalogItem, Category, CategoryRoute, ContentKind, Listing, SourceRef, UnifiedEntry,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AggregatorConfig, AggregatorSettings,
    Config, ConfigError, SelectorConfig, SourceConfig,
};
pub use hub::{EntryDetails, EpisodeListing, Hub, HubError};
pub use matching::{normalize_title, partial_ratio, ratio, FuzzyMatcher};
pub use resolver::LinkResolver;
pub use token::{ContentToken, TokenError};
