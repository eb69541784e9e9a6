//! Periodic polling of Services and their Pods.
//!
//! The poller alternates between sleeping and scanning. A scan lists every
//! Service, then queries the Pods of each Service with a selector one at a
//! time and publishes the Running count. Failures never stop the loop.

use crate::cluster::ClusterReader;
use crate::metrics::ServiceMetrics;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Services returned by the cluster.
    pub services_listed: usize,
    /// Services whose gauge was written.
    pub updated: usize,
    /// Services skipped because their selector is empty.
    pub skipped_empty_selector: usize,
    /// True if the Service list could not be fetched.
    pub list_failed: bool,
}

/// Drives the scan loop against a [`ClusterReader`].
pub struct Poller {
    reader: Arc<dyn ClusterReader>,
    metrics: Arc<ServiceMetrics>,
    interval: Duration,
}

impl Poller {
    /// Creates a poller sleeping `interval` between passes.
    pub fn new(
        reader: Arc<dyn ClusterReader>,
        metrics: Arc<ServiceMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            reader,
            metrics,
            interval,
        }
    }

    /// Runs one full scan.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        let services = match self.reader.list_services().await {
            Ok(services) => services,
            Err(e) => {
                tracing::error!(error = %e, "Service list failed, skipping pass");
                report.list_failed = true;
                return report;
            }
        };
        report.services_listed = services.len();

        for service in &services {
            if !service.has_selector() {
                tracing::trace!(
                    service = %service.name,
                    namespace = %service.namespace,
                    "Skipping service without selector"
                );
                report.skipped_empty_selector += 1;
                continue;
            }

            let running = self
                .reader
                .count_running_pods(&service.namespace, &service.selector)
                .await;
            self.metrics.set(&service.name, &service.namespace, running);
            report.updated += 1;
        }

        report
    }

    /// Scans forever, sleeping `interval` after each pass.
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Poller started");
        loop {
            let report = self.run_pass().await;
            tracing::debug!(
                listed = report.services_listed,
                updated = report.updated,
                skipped = report.skipped_empty_selector,
                list_failed = report.list_failed,
                "Pass complete"
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}
