/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! This module provides Prometheus metrics for the monitoring engine.
//! It exposes metrics about poll executions, queue pressure, and fleet state.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

/// Global Prometheus registry for all engine metrics
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Poll execution counter
/// Labels: brand, status
pub static POLLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "solfleet_polls_total",
        "Total number of poll executions by brand and outcome",
    );
    let counter =
        CounterVec::new(opts, &["brand", "status"]).expect("Failed to create polls counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register polls counter");
    counter
});

/// Poll duration histogram
/// Labels: brand
pub static POLL_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "solfleet_poll_duration_seconds",
        "Poll pipeline latency distribution in seconds",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]);
    let histogram =
        HistogramVec::new(opts, &["brand"]).expect("Failed to create poll duration histogram");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("Failed to register poll duration histogram");
    histogram
});

/// Pending tickets per brand queue
/// Labels: brand
pub static QUEUE_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    let opts = Opts::new(
        "solfleet_queue_depth",
        "Number of pending tickets per brand queue",
    );
    let gauge = IntGaugeVec::new(opts, &["brand"]).expect("Failed to create queue depth gauge");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("Failed to register queue depth gauge");
    gauge
});

/// Job starts delayed by the per-brand rate limiter
/// Labels: brand
pub static RATE_LIMIT_WAITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "solfleet_rate_limit_waits_total",
        "Job starts delayed by the per-brand rate limiter",
    );
    let counter =
        CounterVec::new(opts, &["brand"]).expect("Failed to create rate limit counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register rate limit counter");
    counter
});

/// Number of plants the scheduler currently polls
pub static ACTIVE_PLANTS: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "solfleet_active_plants",
        "Number of plants with an active integration",
    );
    let gauge = IntGauge::with_opts(opts).expect("Failed to create active plants gauge");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("Failed to register active plants gauge");
    gauge
});

/// Encodes all registered metrics in Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_encode() {
        POLLS_TOTAL.with_label_values(&["SOLIS", "SUCCESS"]).inc();
        POLL_DURATION_SECONDS
            .with_label_values(&["SOLIS"])
            .observe(0.2);
        QUEUE_DEPTH.with_label_values(&["SOLIS"]).set(1);
        ACTIVE_PLANTS.set(3);

        let encoded = encode_metrics();
        assert!(encoded.contains("solfleet_polls_total"));
        assert!(encoded.contains("solfleet_poll_duration_seconds"));
        assert!(encoded.contains("solfleet_queue_depth"));
        assert!(encoded.contains("solfleet_active_plants"));
    }
}
