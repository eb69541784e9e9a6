//! Metrics collection and registry.

use prometheus::core::Collector;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Name of the per-Service running-Pod gauge.
pub const TARGET_PODS_METRIC: &str = "kube_service_target_pods_num";

const LABELS: [&str; 2] = ["service", "namespace"];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failure inside the prometheus crate.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry holding the running-Pod gauge.
///
/// The gauge vector synchronizes internally, so the registry can be shared
/// between the poll loop and the HTTP handlers without an outer lock.
pub struct ServiceMetrics {
    registry: Registry,
    target_pods: IntGaugeVec,
}

impl ServiceMetrics {
    /// Creates a new registry with the gauge and process metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let target_pods = IntGaugeVec::new(
            Opts::new(TARGET_PODS_METRIC, "Target pods number of service."),
            &LABELS,
        )?;
        registry.register(Box::new(target_pods.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            target_pods,
        })
    }

    /// Sets the running-Pod count of a Service, replacing any previous value.
    ///
    /// Series are never removed; a Service that disappears keeps its last
    /// value until the process restarts.
    pub fn set(&self, service: &str, namespace: &str, count: u64) {
        let value = i64::try_from(count).unwrap_or(i64::MAX);
        self.target_pods
            .with_label_values(&[service, namespace])
            .set(value);
    }

    /// Returns the current value for a Service without creating the series.
    pub fn get(&self, service: &str, namespace: &str) -> Option<i64> {
        self.target_pods
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let labels = metric.get_label();
                labels
                    .iter()
                    .any(|l| l.get_name() == "service" && l.get_value() == service)
                    && labels
                        .iter()
                        .any(|l| l.get_name() == "namespace" && l.get_value() == namespace)
            })
            .map(|metric| metric.get_gauge().get_value() as i64)
    }

    /// Number of (service, namespace) series currently exported.
    pub fn series_count(&self) -> usize {
        self.target_pods
            .collect()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
