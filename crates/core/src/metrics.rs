//! Prometheus metrics for source probes.
//!
//! This module provides metrics for:
//! - Per-source probe outcomes and latency (catalog, search, details, streams)
//! - Catalog sizes after deduplication
//! - Stream links handed to the host

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Source probes
// =============================================================================

/// Source probes total by outcome.
pub static SOURCE_PROBES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinemux_source_probes_total", "Total source probes"),
        &["source", "operation", "outcome"], // outcome: "ok", "error", "timeout"
    )
    .unwrap()
});

/// Source probe duration in seconds.
pub static SOURCE_PROBE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cinemux_source_probe_duration_seconds",
            "Duration of source probes",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),
        &["source", "operation"],
    )
    .unwrap()
});

// =============================================================================
// Aggregation and resolution
// =============================================================================

/// Unified entries returned per aggregation.
pub static CATALOG_ENTRIES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cinemux_catalog_entries",
            "Number of unified entries returned per aggregation",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &["operation"], // "catalog", "search"
    )
    .unwrap()
});

/// Stream links emitted to the host.
pub static STREAMS_EMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinemux_streams_emitted_total", "Total stream links emitted"),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SOURCE_PROBES.clone()),
        Box::new(SOURCE_PROBE_DURATION.clone()),
        Box::new(CATALOG_ENTRIES.clone()),
        Box::new(STREAMS_EMITTED.clone()),
    ]
}
