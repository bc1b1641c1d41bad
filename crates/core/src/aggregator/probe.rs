//! Time-bounded, fault-isolated calls into a single source.

use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::adapter::SourceError;
use crate::metrics;

/// Why a source contributed nothing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceFault {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Failed(#[from] SourceError),
}

/// Result of one source probe.
///
/// `Completed` with an empty value is a source that legitimately had
/// nothing; `Faulted` is a source that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    Completed(T),
    Faulted(SourceFault),
}

impl<T> ProbeOutcome<T> {
    pub fn is_faulted(&self) -> bool {
        matches!(self, ProbeOutcome::Faulted(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ProbeOutcome::Completed(value) => Some(value),
            ProbeOutcome::Faulted(_) => None,
        }
    }

    pub fn fault(&self) -> Option<&SourceFault> {
        match self {
            ProbeOutcome::Completed(_) => None,
            ProbeOutcome::Faulted(fault) => Some(fault),
        }
    }
}

impl<T: Default> ProbeOutcome<T> {
    /// The value, or the empty contribution of a faulted source.
    pub fn unwrap_or_empty(self) -> T {
        self.ok().unwrap_or_default()
    }
}

/// Run `fut` against `source` with a `limit` ceiling.
///
/// Errors and timeouts are logged, counted and folded into
/// `ProbeOutcome::Faulted`; they never propagate.
pub async fn probe<T, F>(source: &str, operation: &str, limit: Duration, fut: F) -> ProbeOutcome<T>
where
    F: Future<Output = Result<T, SourceError>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(limit, fut).await;
    metrics::SOURCE_PROBE_DURATION
        .with_label_values(&[source, operation])
        .observe(start.elapsed().as_secs_f64());

    let outcome = match result {
        Ok(Ok(value)) => {
            debug!(source = %source, operation = %operation, "Source probe complete");
            ProbeOutcome::Completed(value)
        }
        Ok(Err(e)) => {
            warn!(source = %source, operation = %operation, error = %e, "Source probe failed");
            ProbeOutcome::Faulted(SourceFault::Failed(e))
        }
        Err(_) => {
            warn!(source = %source, operation = %operation, timeout = ?limit, "Source probe timed out");
            ProbeOutcome::Faulted(SourceFault::TimedOut(limit))
        }
    };

    let label = match outcome.fault() {
        None => "ok",
        Some(SourceFault::TimedOut(_)) => "timeout",
        Some(SourceFault::Failed(_)) => "error",
    };
    metrics::SOURCE_PROBES
        .with_label_values(&[source, operation, label])
        .inc();

    outcome
}
