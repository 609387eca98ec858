//! Resolution metrics tracking using OpenTelemetry.

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for setting resolution.
///
/// Tracks lookups, cache hits, source queries, missing values and resolution
/// latencies using OpenTelemetry metrics.
///
/// # Examples
///
/// ```rust,no_run
/// use settings_collector::metrics::ResolutionMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("settings-collector");
/// let metrics = ResolutionMetrics::new(meter);
///
/// let timer = metrics.start_lookup();
/// // ... resolve the value ...
/// metrics.record_resolved(timer);
/// ```
#[derive(Clone)]
pub struct ResolutionMetrics {
    lookups: Counter<u64>,
    cache_hits: Counter<u64>,
    source_queries: Counter<u64>,
    missing_values: Counter<u64>,
    failures: Counter<u64>,
    resolution_duration: Histogram<f64>,
    scopes: Gauge<i64>,
}

impl ResolutionMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let lookups = meter
            .u64_counter("settings_collector.lookups")
            .with_description("Total number of setting reads")
            .build();

        let cache_hits = meter
            .u64_counter("settings_collector.cache.hits")
            .with_description("Number of reads answered from a scope cache")
            .build();

        let source_queries = meter
            .u64_counter("settings_collector.source.queries")
            .with_description("Number of loads that went to the sources")
            .build();

        let missing_values = meter
            .u64_counter("settings_collector.missing")
            .with_description("Number of reads of required settings with no value")
            .build();

        let failures = meter
            .u64_counter("settings_collector.failures")
            .with_description("Number of reads that ended in an error")
            .build();

        let resolution_duration = meter
            .f64_histogram("settings_collector.resolution.duration")
            .with_description("Duration of setting reads in seconds, cache hits included")
            .with_unit("s")
            .build();

        let scopes = meter
            .i64_gauge("settings_collector.scopes")
            .with_description("Number of scopes, the root included")
            .build();

        Self {
            lookups,
            cache_hits,
            source_queries,
            missing_values,
            failures,
            resolution_duration,
            scopes,
        }
    }

    /// Start a lookup timer.
    ///
    /// Pass the returned `Instant` to [`record_resolved`](Self::record_resolved)
    /// or [`record_failure`](Self::record_failure).
    pub fn start_lookup(&self) -> Instant {
        self.lookups.add(1, &[]);
        Instant::now()
    }

    /// Record a read answered from cache.
    pub fn record_cache_hit(&self) {
        self.cache_hits.add(1, &[]);
    }

    /// Record one load sent to the sources.
    pub fn record_source_query(&self) {
        self.source_queries.add(1, &[]);
    }

    /// Record a lookup that produced a value.
    pub fn record_resolved(&self, start: Instant) {
        self.resolution_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    /// Record a lookup that failed; `missing` marks required settings with no
    /// value anywhere.
    pub fn record_failure(&self, start: Instant, missing: bool) {
        if missing {
            self.missing_values.add(1, &[]);
        }
        self.failures.add(1, &[]);
        self.resolution_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    /// Update the number of scopes.
    pub fn update_scope_count(&self, count: usize) {
        self.scopes.record(i64::try_from(count).unwrap_or(i64::MAX), &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::global;

    #[test]
    fn test_metrics_creation() {
        let meter = global::meter("test");
        let metrics = ResolutionMetrics::new(meter);

        // Test basic operations don't panic
        let timer = metrics.start_lookup();
        metrics.record_cache_hit();
        metrics.record_resolved(timer);

        let timer = metrics.start_lookup();
        metrics.record_source_query();
        metrics.record_failure(timer, true);

        metrics.update_scope_count(3);
    }

    #[test]
    fn test_metrics_clone() {
        let meter = global::meter("test");
        let metrics = ResolutionMetrics::new(meter);
        let metrics2 = metrics.clone();

        let timer1 = metrics.start_lookup();
        let timer2 = metrics2.start_lookup();

        metrics.record_resolved(timer1);
        metrics2.record_failure(timer2, false);
    }
}
