//! Prometheus exposition of per-Service running-Pod counts.
//!
//! # Metrics Exposed
//!
//! - `kube_service_target_pods_num{service, namespace}` - Running Pods
//!   selected by the Service at the last poll
//! - `process_*` - Standard process metrics (Linux only)
//!
//! # Routes
//!
//! - `GET /metrics` - Text exposition format
//! - `GET /` - Static landing page linking to `/metrics`
//!
//! # Example
//!
//! ```no_run
//! use service_target_pods::metrics::ServiceMetrics;
//!
//! let metrics = ServiceMetrics::new().expect("Failed to create registry");
//! metrics.set("web", "default", 2);
//! assert_eq!(metrics.get("web", "default"), Some(2));
//! ```

mod collector;
mod server;

pub use collector::{MetricsError, ServiceMetrics, TARGET_PODS_METRIC};
pub use server::{MetricsServer, ServerError, ROOT_PAGE};
