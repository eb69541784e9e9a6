//! Service Target Pods Exporter Library
//!
//! Periodically counts, for every Kubernetes Service with a Pod selector,
//! how many of the selected Pods are Running, and exposes the count as the
//! `kube_service_target_pods_num` Prometheus gauge.
//!
//! # Architecture
//!
//! ```text
//! poller (background) → cluster → metrics ← HTTP scrape (foreground)
//! ```
//!
//! The poll loop and the HTTP server share one [`ServiceMetrics`] registry.
//! Every value is recomputed each pass; nothing is persisted.
//!
//! # Example
//!
//! ```no_run
//! use service_target_pods::{cluster, metrics::ServiceMetrics, poller::Poller};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = Arc::new(cluster::connect().await?);
//! let metrics = Arc::new(ServiceMetrics::new()?);
//!
//! let poller = Poller::new(reader, metrics.clone(), Duration::from_secs(30));
//! let report = poller.run_pass().await;
//! println!("updated {} services", report.updated);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod metrics;
pub mod poller;

// Re-export commonly used types at crate root
pub use cluster::{ClusterError, ClusterReader, KubeClusterReader, MockClusterReader};
pub use config::{ConfigError, ExporterConfig};
pub use metrics::{MetricsServer, ServiceMetrics};
pub use poller::{PassReport, Poller};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
