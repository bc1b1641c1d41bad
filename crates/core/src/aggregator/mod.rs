//! Concurrent catalog aggregation across sources.
//!
//! Every source is probed concurrently with its own timeout; a source that
//! fails or times out contributes nothing and is reported in
//! [`AggregationReport::source_errors`]. Results are merged in static source
//! order by [`merge_items`].

mod dedup;
mod probe;
mod service;

pub use dedup::merge_items;
pub use probe::{probe, ProbeOutcome, SourceFault};
pub use service::Aggregator;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::catalog::UnifiedEntry;

/// Merged entries plus what went wrong while gathering them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationReport {
    pub entries: Vec<UnifiedEntry>,
    /// Sources that faulted (source id -> error message).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub source_errors: HashMap<String, String>,
    pub duration_ms: u64,
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
