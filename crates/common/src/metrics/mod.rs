//! Metrics and observability utilities
//!
//! Prometheus metrics with a shared prefix and standardized naming.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperLens metrics
pub const METRICS_PREFIX: &str = "paperlens";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.025, // 25ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
    120.0, // 2m
];

/// Buckets for completion latency (dominated by the remote model)
pub const COMPLETION_BUCKETS: &[f64] = &[
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    20.00, // 20s
    30.00, // 30s
    60.00, // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Completion metrics
    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion calls (after retries)"
    );

    describe_histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Completion latency in seconds, including retries"
    );

    describe_counter!(
        format!("{}_completion_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion retry attempts"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents ingested"
    );

    describe_counter!(
        format!("{}_characters_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Total characters of text extracted"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Document ingestion latency in seconds"
    );

    // Feature metrics
    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Total document analyses"
    );

    describe_counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered"
    );

    describe_counter!(
        format!("{}_comparisons_total", METRICS_PREFIX),
        Unit::Count,
        "Total document comparisons"
    );

    // Session metrics
    describe_gauge!(
        format!("{}_sessions_active", METRICS_PREFIX),
        Unit::Count,
        "Number of live sessions"
    );

    describe_counter!(
        format!("{}_sessions_expired_total", METRICS_PREFIX),
        Unit::Count,
        "Total sessions evicted after idling past their TTL"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record completion metrics
pub fn record_completion(duration_secs: f64, provider: &str, model: &str, success: bool, attempts: u32) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        "provider" => provider.to_string(),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        "provider" => provider.to_string()
    )
    .record(duration_secs);

    if attempts > 1 {
        counter!(
            format!("{}_completion_retries_total", METRICS_PREFIX),
            "provider" => provider.to_string()
        )
        .increment(u64::from(attempts - 1));
    }
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, format: &str, char_count: usize) {
    counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_characters_extracted_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(char_count as u64);

    histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .record(duration_secs);
}

pub fn record_analysis(strategy: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        "strategy" => strategy.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_question(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(format!("{}_questions_total", METRICS_PREFIX), "status" => status).increment(1);
}

pub fn record_comparison(document_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        format!("{}_comparisons_total", METRICS_PREFIX),
        "documents" => document_count.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Helper to record session lifecycle metrics
pub fn record_sessions(active: usize, expired: usize) {
    gauge!(format!("{}_sessions_active", METRICS_PREFIX)).set(active as f64);
    if expired > 0 {
        counter!(format!("{}_sessions_expired_total", METRICS_PREFIX)).increment(expired as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, COMPLETION_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/v1/sessions/{id}");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        record_completion(0.5, "mock", "mock-completion", true, 2);
        record_ingestion(0.01, "pdf", 1_200);
        record_analysis("truncate", true);
        record_question(false);
        record_comparison(3, true);
        record_sessions(4, 1);
    }
}
