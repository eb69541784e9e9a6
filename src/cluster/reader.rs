//! Cluster reader abstraction.
//!
//! The trait lets the poll loop run against the real API server or an
//! in-memory cluster in tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while talking to the cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// An error returned by the [`kube`] client when talking to the API
    /// server.
    #[error("kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),
    /// No usable client configuration could be resolved.
    #[error("failed to resolve cluster configuration: {0}")]
    Config(String),
    /// Failure raised by a non-kube reader, e.g. the in-memory one.
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// A Service as seen during a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service name.
    pub name: String,
    /// Namespace the Service lives in.
    pub namespace: String,
    /// Pod selector; empty when the Service selects nothing.
    pub selector: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    /// Creates a descriptor from its parts.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        selector: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            selector,
        }
    }

    /// Returns true if this Service scopes a set of Pods.
    pub fn has_selector(&self) -> bool {
        !self.selector.is_empty()
    }
}

/// Lifecycle phase of a Pod.
///
/// Unrecognized values map to [`PodPhase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// Accepted but not all containers started.
    Pending,
    /// Bound to a node with at least one container running.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// All containers terminated, at least one in failure.
    Failed,
    /// Phase missing or not recognized.
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// A Pod as seen during a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodObservation {
    /// Namespace the Pod lives in.
    pub namespace: String,
    /// Lifecycle phase at observation time.
    pub phase: PodPhase,
}

impl PodObservation {
    /// Creates an observation from its parts.
    pub fn new(namespace: impl Into<String>, phase: PodPhase) -> Self {
        Self {
            namespace: namespace.into(),
            phase,
        }
    }

    /// Returns true if the Pod is in the Running phase.
    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }
}

/// Read operations issued against the control plane.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Lists Services across all namespaces.
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClusterError>;

    /// Lists Pods in `namespace` matching every `key=value` pair of `selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<PodObservation>, ClusterError>;

    /// Counts the Running Pods matched by `selector`.
    ///
    /// Never fails: a failed query goes through [`pod_query_fallback`].
    async fn count_running_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> u64 {
        match self.list_pods(namespace, selector).await {
            Ok(pods) => pods.iter().filter(|p| p.is_running()).count() as u64,
            Err(e) => pod_query_fallback(namespace, selector, &e),
        }
    }
}

/// Value reported when a Pod query fails.
///
/// A failed query is indistinguishable from zero Running Pods in the
/// exported metric; only this log line tells them apart.
pub fn pod_query_fallback(
    namespace: &str,
    selector: &BTreeMap<String, String>,
    error: &ClusterError,
) -> u64 {
    tracing::error!(
        namespace,
        selector = %super::render_label_selector(selector),
        error = %error,
        "Pod list failed, reporting zero running pods"
    );
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_phase_from_str() {
        assert_eq!(PodPhase::from("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from("Pending"), PodPhase::Pending);
        assert_eq!(PodPhase::from("Succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from("Failed"), PodPhase::Failed);
        assert_eq!(PodPhase::from("running"), PodPhase::Unknown);
        assert_eq!(PodPhase::from(""), PodPhase::Unknown);
    }

    #[test]
    fn test_has_selector() {
        let empty = ServiceDescriptor::new("batch", "default", BTreeMap::new());
        assert!(!empty.has_selector());

        let selector = BTreeMap::from([("app".to_string(), "web".to_string())]);
        let web = ServiceDescriptor::new("web", "default", selector);
        assert!(web.has_selector());
    }

    #[test]
    fn test_fallback_is_zero() {
        let err = ClusterError::Unavailable("connection refused".to_string());
        assert_eq!(pod_query_fallback("default", &BTreeMap::new(), &err), 0);
    }
}
