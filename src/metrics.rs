//! Metrics for deprecated route traffic.
//!
//! Provides Prometheus counters for annotated responses and for Sunset
//! headers that had to be dropped.

use prometheus::{IntCounterVec, Opts, Registry};

/// Metrics collector for deprecation annotations.
#[derive(Clone)]
pub struct DeprecationMetrics {
    /// Registry for all metrics
    registry: Registry,

    /// Counter for responses that received deprecation headers
    pub annotated_total: IntCounterVec,

    /// Counter for Sunset headers omitted, by reason
    pub sunset_rejected_total: IntCounterVec,
}

impl DeprecationMetrics {
    /// Create a new metrics collector with the given prefix.
    pub fn new(prefix: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let annotated_total = IntCounterVec::new(
            Opts::new(
                format!("{}_annotated_responses_total", prefix),
                "Total number of responses annotated with deprecation headers",
            ),
            &["route_id"],
        )?;

        let sunset_rejected_total = IntCounterVec::new(
            Opts::new(
                format!("{}_sunset_rejected_total", prefix),
                "Total number of Sunset headers omitted because of invalid configuration",
            ),
            &["route_id", "reason"],
        )?;

        registry.register(Box::new(annotated_total.clone()))?;
        registry.register(Box::new(sunset_rejected_total.clone()))?;

        Ok(Self {
            registry,
            annotated_total,
            sunset_rejected_total,
        })
    }

    /// Record an annotated response.
    pub fn record_annotation(&self, route_id: &str) {
        self.annotated_total.with_label_values(&[route_id]).inc();
    }

    /// Record an omitted Sunset header.
    pub fn record_sunset_rejected(&self, route_id: &str, reason: &str) {
        self.sunset_rejected_total
            .with_label_values(&[route_id, reason])
            .inc();
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
