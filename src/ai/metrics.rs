//! Pipeline Metrics Collection
//!
//! Per-run aggregation of completion calls, token usage and latency.
//! Thread-safe for the concurrent organ fan-out; no lock is ever held across
//! an external call.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = MetricsCollector::new(run_id.as_str());
//! metrics.record_completion(&completion);
//! let usage = metrics.summary();
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use crate::ai::provider::{Completion, TokenUsage};

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector for one pipeline run.
pub struct MetricsCollector {
    run_id: String,
    start_time: Instant,
    /// Completed external calls
    api_calls: AtomicU32,
    /// Failed external calls (including timeouts)
    failed_calls: AtomicU32,
    /// Sections answered without an external call
    skipped_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Usage statistics attached to a finished report
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UsageSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub failed_calls: u32,
    pub skipped_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            failed_calls: AtomicU32::new(0),
            skipped_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Record a successful completion
    pub fn record_completion(&self, completion: &Completion) {
        self.record_tokens(&completion.usage, completion.timing.total_ms);
    }

    /// Record token usage directly
    pub fn record_tokens(&self, usage: &TokenUsage, latency_ms: u64) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn summary(&self) -> UsageSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        UsageSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            skipped_calls: self.skipped_calls.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
        }
    }
}

impl UsageSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             API Calls: {} ({} failed, {} skipped)\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.failed_calls,
            self.skipped_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        )
    }
}

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(run_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(run_id))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseMetadata, ResponseTiming};

    #[test]
    fn test_record_completion() {
        let metrics = MetricsCollector::new("run-1");

        let completion = Completion {
            text: "The liver is normal.".to_string(),
            usage: TokenUsage::new(100, 50),
            timing: ResponseTiming { total_ms: 500 },
            metadata: ResponseMetadata {
                model: "gemini-2.5-flash".to_string(),
                provider: "gemini".to_string(),
            },
        };

        metrics.record_completion(&completion);
        metrics.record_skip();
        metrics.record_failure();

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1);
        assert_eq!(summary.failed_calls, 1);
        assert_eq!(summary.skipped_calls, 1);
        assert_eq!(summary.total_tokens, 150);
        assert!((summary.avg_latency_ms - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new("concurrent"));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_tokens(&TokenUsage::new(10, 5), 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 600);
        assert_eq!(summary.input_tokens, 6000);
        assert_eq!(summary.output_tokens, 3000);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-test");
        metrics.record_tokens(&TokenUsage::new(1000, 500), 1000);

        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("1500"));
    }
}
