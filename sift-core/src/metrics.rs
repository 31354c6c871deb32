//! Process-wide running query statistics.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Immutable copy of the running aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    /// Mean latency in milliseconds.
    pub average_response_time: f64,
    /// Fraction of queries served from cache, in [0, 1].
    pub cache_hit_rate: f64,
    /// Fraction of queries that failed, in [0, 1].
    pub error_rate: f64,
}

/// Maintains running means without retaining history.
///
/// Every mean uses the incremental update `mean += (x - mean) / n`, so the
/// stored values equal the arithmetic mean of everything recorded.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    state: Mutex<MetricsSnapshot>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self, response_time_ms: f64, cache_hit: bool, error: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.total_queries += 1;
        let n = state.total_queries as f64;

        state.average_response_time += (response_time_ms - state.average_response_time) / n;
        state.cache_hit_rate += (indicator(cache_hit) - state.cache_hit_rate) / n;
        state.error_rate += (indicator(error) - state.error_rate) / n;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
