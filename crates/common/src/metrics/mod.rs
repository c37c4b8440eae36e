//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming for queries, ingestion,
//! and capability calls.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all ScholarGraph metrics
pub const METRICS_PREFIX: &str = "scholargraph";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of answered queries"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end query latency in seconds"
    );

    describe_counter!(
        format!("{}_records_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total canonical records ingested"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upload-to-ready ingestion latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding batch calls"
    );

    describe_counter!(
        format!("{}_generation_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Generation calls resolved by the fallback answer"
    );

    tracing::info!("Metrics registered");
}

/// Record one answered query
pub fn record_query(duration_secs: f64, graph_used: bool, source_count: usize) {
    let path = if graph_used { "hybrid" } else { "vector" };

    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "path" => path,
        "matched" => if source_count > 0 { "yes" } else { "no" }
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "path" => path
    )
    .record(duration_secs);
}

/// Record one completed ingestion batch
pub fn record_ingestion(duration_secs: f64, records: usize) {
    counter!(format!("{}_records_ingested_total", METRICS_PREFIX)).increment(records as u64);
    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a generation call falling back
pub fn record_generation_failure(timed_out: bool) {
    counter!(
        format!("{}_generation_failures_total", METRICS_PREFIX),
        "kind" => if timed_out { "timeout" } else { "error" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_does_not_panic_without_recorder() {
        record_query(0.05, true, 3);
        record_ingestion(1.2, 100);
        record_generation_failure(false);
    }
}
