//! Prometheus-backed metrics sink
//!
//! Events acknowledged by the local sink are folded into a Prometheus
//! registry that the `/metrics` endpoint exposes. Occurrences become
//! counters; integers become both a last-value gauge and a running sum.

use std::sync::Arc;

use async_trait::async_trait;
use diagd_core::domain::metrics::{
    INSPECT_BUDGET_METRIC_ID, LAST_REBOOT_UPTIME_METRIC_ID, NON_PLATFORM_REJECTED_METRIC_ID,
    SNAPSHOT_GENERATION_METRIC_ID, TIMED_OUT_DATA_METRIC_ID,
};
use diagd_core::domain::{Event, EventKind};
use diagd_core::ports::{MetricsConnection, MetricsSink, SinkError, SubmitStatus};
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Human-readable label for a metric id.
pub fn metric_name(metric_id: u32) -> &'static str {
    match metric_id {
        LAST_REBOOT_UPTIME_METRIC_ID => "last_reboot_uptime",
        TIMED_OUT_DATA_METRIC_ID => "timed_out_data",
        INSPECT_BUDGET_METRIC_ID => "inspect_budget",
        SNAPSHOT_GENERATION_METRIC_ID => "snapshot_generation",
        NON_PLATFORM_REJECTED_METRIC_ID => "non_platform_rejected",
        _ => "unknown",
    }
}

/// Registry holding everything the sink has accepted.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: accepted events by (metric, dimensions, kind)
    pub events_total: IntCounterVec,
    /// Gauge: last integer value by (metric, dimensions)
    pub integer_last: IntGaugeVec,
    /// Counter: sum of integer values by (metric, dimensions)
    pub integer_sum: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("diagd".to_string()), None)?;

        let events_total = IntCounterVec::new(
            Opts::new("events_total", "Metric events accepted by the sink"),
            &["metric", "dimensions", "kind"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let integer_last = IntGaugeVec::new(
            Opts::new("integer_last", "Last value of integer metric events"),
            &["metric", "dimensions"],
        )?;
        registry.register(Box::new(integer_last.clone()))?;

        let integer_sum = IntCounterVec::new(
            Opts::new("integer_sum", "Sum of integer metric event values"),
            &["metric", "dimensions"],
        )?;
        registry.register(Box::new(integer_sum.clone()))?;

        Ok(Self {
            registry,
            events_total,
            integer_last,
            integer_sum,
        })
    }

    /// Folds one event into the registry.
    pub fn record_event(&self, event: &Event) {
        let metric = metric_name(event.metric_id());
        let dimensions = event
            .dimensions()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        match event.kind() {
            EventKind::Occurrence => {
                self.events_total
                    .with_label_values(&[metric, &dimensions, "occurrence"])
                    .inc();
            }
            EventKind::Integer => {
                self.events_total
                    .with_label_values(&[metric, &dimensions, "integer"])
                    .inc();
                self.integer_last
                    .with_label_values(&[metric, &dimensions])
                    .set(i64::try_from(event.value()).unwrap_or(i64::MAX));
                self.integer_sum
                    .with_label_values(&[metric, &dimensions])
                    .inc_by(event.value());
            }
        }
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

// ============================================================================
// Sink adapter
// ============================================================================

/// In-process sink that never disconnects
#[derive(Clone)]
pub struct PrometheusSink {
    registry: Arc<MetricsRegistry>,
}

impl PrometheusSink {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

struct PrometheusConnection {
    registry: Arc<MetricsRegistry>,
}

#[async_trait]
impl MetricsConnection for PrometheusConnection {
    async fn submit(&self, event: &Event) -> Result<SubmitStatus, SinkError> {
        self.registry.record_event(event);
        Ok(SubmitStatus::Ok)
    }
}

#[async_trait]
impl MetricsSink for PrometheusSink {
    async fn connect(&self) -> Result<Arc<dyn MetricsConnection>, SinkError> {
        Ok(Arc::new(PrometheusConnection {
            registry: Arc::clone(&self.registry),
        }))
    }
}
