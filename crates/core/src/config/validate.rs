use regex_lite::Regex;
use std::collections::HashSet;
use url::Url;

use super::{types::Config, ConfigError};
use crate::adapter::SelectorSet;

/// Validate configuration
/// Currently validates:
/// - Probe timeout is not 0
/// - Thresholds are within 1..=100 and loose <= strict
/// - Source and category ids are unique
/// - Category routes reference configured sources
/// - Base URLs are absolute http(s) URLs
/// - Every selector and the stream pattern compile
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let agg = &config.aggregator;
    if agg.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "aggregator.probe_timeout_secs cannot be 0".to_string(),
        ));
    }
    for (name, value) in [
        ("strict_threshold", agg.strict_threshold),
        ("loose_threshold", agg.loose_threshold),
    ] {
        if value == 0 || value > 100 {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.{} must be within 1..=100, got {}",
                name, value
            )));
        }
    }
    if agg.loose_threshold > agg.strict_threshold {
        return Err(ConfigError::ValidationError(
            "aggregator.loose_threshold cannot exceed strict_threshold".to_string(),
        ));
    }

    let mut source_ids = HashSet::new();
    for source in &config.sources {
        if source.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "source id cannot be empty".to_string(),
            ));
        }
        if !source_ids.insert(source.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate source id: {}",
                source.id
            )));
        }
        let base_ok = Url::parse(&source.base_url)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !base_ok {
            return Err(ConfigError::ValidationError(format!(
                "sources.{}.base_url must be an http(s) URL",
                source.id
            )));
        }
        if source.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "sources.{}.timeout_secs cannot be 0",
                source.id
            )));
        }

        SelectorSet::compile(&source.selectors).map_err(|e| {
            ConfigError::ValidationError(format!("sources.{}.selectors.{}", source.id, e))
        })?;
        Regex::new(&source.stream_pattern).map_err(|e| {
            ConfigError::ValidationError(format!(
                "sources.{}.stream_pattern does not compile: {}",
                source.id, e
            ))
        })?;
    }

    let mut category_ids = HashSet::new();
    for category in &config.categories {
        if !category_ids.insert(category.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate category id: {}",
                category.id
            )));
        }
        for route in &category.routes {
            if !source_ids.contains(route.source.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "category {} routes to unknown source {}",
                    category.id, route.source
                )));
            }
        }
    }

    Ok(())
}
