//! Aggregate render statistics for one harness instance

use chrono::{DateTime, Utc};
use screentest_common::{RenderResult, StatsSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic counters updated by concurrent renders
#[derive(Debug)]
pub struct HarnessStats {
    render_count: AtomicU64,
    error_count: AtomicU64,
    total_output_chars: AtomicU64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for HarnessStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessStats {
    pub fn new() -> Self {
        Self {
            render_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_output_chars: AtomicU64::new(0),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Fold one finished render into the counters
    pub fn record(&self, result: &RenderResult) {
        self.render_count.fetch_add(1, Ordering::Relaxed);
        self.error_count
            .fetch_add(result.error_messages.len() as u64, Ordering::Relaxed);
        self.total_output_chars
            .fetch_add(result.output_chars() as u64, Ordering::Relaxed);
    }

    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn total_output_chars(&self) -> u64 {
        self.total_output_chars.load(Ordering::Relaxed)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            render_count: self.render_count(),
            error_count: self.error_count(),
            total_output_chars: self.total_output_chars(),
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
