//! Prometheus metrics for the integration core.
//!
//! All metrics follow the naming convention: `ic_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., bus_events_published_total)
//! - **Gauge**: Value that can go up or down (e.g., bus_queue_depth)
//! - **Histogram**: Distribution of values (e.g., health_check_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Events accepted by the bus
    pub static ref BUS_EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("ic_bus_events_published_total", "Events accepted by the event bus"),
        &["kind", "source"]
    ).expect("metric creation failed");

    /// Successful handler invocations
    pub static ref BUS_EVENTS_DELIVERED: CounterVec = CounterVec::new(
        Opts::new("ic_bus_events_delivered_total", "Successful handler invocations"),
        &["kind"]
    ).expect("metric creation failed");

    /// Handler or transport failures, by source system
    pub static ref BUS_HANDLER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("ic_bus_delivery_failures_total", "Delivery failures by source system"),
        &["source"]
    ).expect("metric creation failed");

    /// Events dropped at dequeue because they expired
    pub static ref BUS_EVENTS_EXPIRED: Counter = Counter::new(
        "ic_bus_events_expired_total",
        "Events dropped because expires_at had passed"
    ).expect("metric creation failed");

    /// Critical events re-queued after a failed delivery
    pub static ref BUS_RETRIES: Counter = Counter::new(
        "ic_bus_retries_total",
        "Critical events re-queued after a delivery failure"
    ).expect("metric creation failed");

    /// Events abandoned after exhausting retries
    pub static ref BUS_DEAD_LETTERS: Counter = Counter::new(
        "ic_bus_dead_letters_total",
        "Critical events abandoned after exhausting retries"
    ).expect("metric creation failed");

    /// Current pending queue depth
    pub static ref BUS_QUEUE_DEPTH: Gauge = Gauge::new(
        "ic_bus_queue_depth",
        "Events waiting in the pending queue"
    ).expect("metric creation failed");

    // =========================================================================
    // HEALTH MONITOR METRICS
    // =========================================================================

    /// Health checks by outcome
    pub static ref HEALTH_CHECKS: CounterVec = CounterVec::new(
        Opts::new("ic_health_checks_total", "Health checks performed"),
        &["outcome"]  // outcome: healthy/unhealthy/timeout
    ).expect("metric creation failed");

    /// Health check duration
    pub static ref HEALTH_CHECK_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ic_health_check_duration_seconds",
            "Time spent in a single health check"
        ).buckets(exponential_buckets(0.001, 2.0, 14).expect("bucket creation failed"))
    ).expect("metric creation failed");

    // =========================================================================
    // LOAD BALANCER METRICS
    // =========================================================================

    /// Instance selections by strategy and outcome
    pub static ref LB_SELECTIONS: CounterVec = CounterVec::new(
        Opts::new("ic_lb_selections_total", "Instance selections"),
        &["strategy", "outcome"]  // outcome: selected/none
    ).expect("metric creation failed");

    // =========================================================================
    // ALERT METRICS
    // =========================================================================

    /// Alerts raised by type
    pub static ref ALERTS_RAISED: CounterVec = CounterVec::new(
        Opts::new("ic_alerts_raised_total", "Alerts raised"),
        &["alert_type"]
    ).expect("metric creation failed");

    /// Alerts resolved
    pub static ref ALERTS_RESOLVED: Counter = Counter::new(
        "ic_alerts_resolved_total",
        "Alerts explicitly resolved"
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event Bus
        Box::new(BUS_EVENTS_PUBLISHED.clone()),
        Box::new(BUS_EVENTS_DELIVERED.clone()),
        Box::new(BUS_HANDLER_FAILURES.clone()),
        Box::new(BUS_EVENTS_EXPIRED.clone()),
        Box::new(BUS_RETRIES.clone()),
        Box::new(BUS_DEAD_LETTERS.clone()),
        Box::new(BUS_QUEUE_DEPTH.clone()),
        // Health
        Box::new(HEALTH_CHECKS.clone()),
        Box::new(HEALTH_CHECK_DURATION.clone()),
        // Load balancer
        Box::new(LB_SELECTIONS.clone()),
        // Alerts
        Box::new(ALERTS_RAISED.clone()),
        Box::new(ALERTS_RESOLVED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
