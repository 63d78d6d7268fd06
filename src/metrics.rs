//! Prometheus metrics for a price feed
//!
//! Each `PriceFeed` owns its own registry so that feeds for different
//! networks never share counters:
//! - Cache hit/miss counters
//! - Remote calls by function signature
//! - Resolution and subscription tick failures
//! - Active subscriptions gauge

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Metrics state for one feed
pub struct FeedMetrics {
    /// Prometheus registry
    registry: Registry,
    /// Reads answered from the cache
    pub cache_hits: IntCounter,
    /// Reads that went to the network
    pub cache_misses: IntCounter,
    /// Remote calls issued, labelled by function signature
    pub remote_calls: IntCounterVec,
    /// Failed registry lookups
    pub resolution_failures: IntCounter,
    /// Failed subscription ticks
    pub tick_failures: IntCounter,
    /// Subscriptions currently polling
    pub active_subscriptions: IntGauge,
}

impl FeedMetrics {
    /// Create a new metrics state with all metrics registered
    pub fn new(network: &str) -> Self {
        let registry = Registry::new_custom(Some("oracle_feeds".to_string()), None)
            .expect("Failed to create metrics registry");

        let counter = |name: &str, help: &str| {
            let counter = IntCounter::with_opts(
                Opts::new(name, help).const_label("network", network),
            )
            .expect("Failed to create counter");
            registry
                .register(Box::new(counter.clone()))
                .expect("Failed to register counter");
            counter
        };

        let cache_hits = counter("cache_hits_total", "Reads served from the value cache");
        let cache_misses = counter("cache_misses_total", "Reads that required a remote call");
        let resolution_failures = counter(
            "resolution_failures_total",
            "Registry lookups that failed or returned the zero address",
        );
        let tick_failures = counter(
            "subscription_tick_failures_total",
            "Subscription ticks whose fetch failed",
        );

        let remote_calls = IntCounterVec::new(
            Opts::new("remote_calls_total", "Remote contract calls issued")
                .const_label("network", network),
            &["signature"],
        )
        .expect("Failed to create remote_calls counter");
        registry
            .register(Box::new(remote_calls.clone()))
            .expect("Failed to register remote_calls");

        let active_subscriptions = IntGauge::with_opts(
            Opts::new("active_subscriptions", "Subscriptions currently polling")
                .const_label("network", network),
        )
        .expect("Failed to create active_subscriptions gauge");
        registry
            .register(Box::new(active_subscriptions.clone()))
            .expect("Failed to register active_subscriptions");

        Self {
            registry,
            cache_hits,
            cache_misses,
            remote_calls,
            resolution_failures,
            tick_failures,
            active_subscriptions,
        }
    }

    pub fn record_remote_call(&self, signature: &str) {
        self.remote_calls.with_label_values(&[signature]).inc();
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
