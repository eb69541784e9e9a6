//! In-memory cluster for tests and demos.

use super::{ClusterError, ClusterReader, PodObservation, PodPhase, ServiceDescriptor};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Scope of an injected Pod list failure; `None` covers the whole namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PodListFailure {
    namespace: String,
    selector: Option<BTreeMap<String, String>>,
}

impl PodListFailure {
    fn covers(&self, namespace: &str, selector: &BTreeMap<String, String>) -> bool {
        self.namespace == namespace && self.selector.as_ref().map_or(true, |s| s == selector)
    }
}

#[derive(Debug, Clone)]
struct MockPod {
    namespace: String,
    labels: BTreeMap<String, String>,
    phase: PodPhase,
}

/// Mock cluster reader holding Services and Pods in memory.
///
/// Pod listing applies the selector the way the API server does: a Pod
/// matches when it carries every `key=value` pair of the selector.
#[derive(Debug, Default)]
pub struct MockClusterReader {
    services: Mutex<Vec<ServiceDescriptor>>,
    pods: Mutex<Vec<MockPod>>,
    fail_service_list: AtomicBool,
    failing_pod_lists: Mutex<Vec<PodListFailure>>,
    pod_queries: AtomicU64,
}

impl MockClusterReader {
    /// Creates an empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a Service; an empty `selector` slice gives a selector-less Service.
    pub fn add_service(&self, name: &str, namespace: &str, selector: &[(&str, &str)]) {
        let selector = to_map(selector);
        self.lock_services()
            .push(ServiceDescriptor::new(name, namespace, selector));
    }

    /// Removes a Service, leaving its Pods in place.
    pub fn remove_service(&self, name: &str, namespace: &str) {
        self.lock_services()
            .retain(|s| !(s.name == name && s.namespace == namespace));
    }

    /// Adds a Pod carrying `labels`.
    pub fn add_pod(&self, namespace: &str, labels: &[(&str, &str)], phase: PodPhase) {
        self.lock_pods().push(MockPod {
            namespace: namespace.to_string(),
            labels: to_map(labels),
            phase,
        });
    }

    /// Moves every Pod of `namespace` carrying `labels` to `phase`.
    pub fn set_pod_phase(&self, namespace: &str, labels: &[(&str, &str)], phase: PodPhase) {
        let labels = to_map(labels);
        for pod in self.lock_pods().iter_mut() {
            if pod.namespace == namespace && matches(&labels, &pod.labels) {
                pod.phase = phase;
            }
        }
    }

    /// Makes `list_services` fail until switched back.
    pub fn set_service_list_failure(&self, fail: bool) {
        self.fail_service_list.store(fail, Ordering::SeqCst);
    }

    /// Makes `list_pods` fail for every selector in `namespace` until
    /// switched back.
    pub fn set_pod_list_failure(&self, namespace: &str, fail: bool) {
        self.set_failure(
            PodListFailure {
                namespace: namespace.to_string(),
                selector: None,
            },
            fail,
        );
    }

    /// Makes `list_pods` fail for exactly this `namespace` and `selector`
    /// until switched back. Other selectors in the namespace keep working.
    pub fn set_selector_pod_list_failure(
        &self,
        namespace: &str,
        selector: &[(&str, &str)],
        fail: bool,
    ) {
        self.set_failure(
            PodListFailure {
                namespace: namespace.to_string(),
                selector: Some(to_map(selector)),
            },
            fail,
        );
    }

    fn set_failure(&self, failure: PodListFailure, fail: bool) {
        let mut failing = self
            .failing_pod_lists
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        failing.retain(|f| *f != failure);
        if fail {
            failing.push(failure);
        }
    }

    /// Number of `list_pods` calls served so far.
    pub fn pod_queries(&self) -> u64 {
        self.pod_queries.load(Ordering::SeqCst)
    }

    fn lock_services(&self) -> std::sync::MutexGuard<'_, Vec<ServiceDescriptor>> {
        self.services.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_pods(&self) -> std::sync::MutexGuard<'_, Vec<MockPod>> {
        self.pods.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ClusterReader for MockClusterReader {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClusterError> {
        if self.fail_service_list.load(Ordering::SeqCst) {
            return Err(ClusterError::Unavailable(
                "service list rejected by mock cluster".to_string(),
            ));
        }
        Ok(self.lock_services().clone())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<PodObservation>, ClusterError> {
        self.pod_queries.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_pod_lists
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|f| f.covers(namespace, selector));
        if failing {
            return Err(ClusterError::Unavailable(format!(
                "pod list in {namespace} rejected by mock cluster"
            )));
        }

        Ok(self
            .lock_pods()
            .iter()
            .filter(|pod| pod.namespace == namespace && matches(selector, &pod.labels))
            .map(|pod| PodObservation::new(&pod.namespace, pod.phase))
            .collect())
    }
}

fn matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_selector_matching() {
        let cluster = MockClusterReader::new();
        cluster.add_pod("default", &[("app", "web"), ("tier", "front")], PodPhase::Running);
        cluster.add_pod("default", &[("app", "api")], PodPhase::Running);
        cluster.add_pod("other", &[("app", "web")], PodPhase::Running);

        let selector = to_map(&[("app", "web")]);
        let pods = cluster.list_pods("default", &selector).await.unwrap();
        assert_eq!(pods.len(), 1);

        let selector = to_map(&[("app", "web"), ("tier", "back")]);
        let pods = cluster.list_pods("default", &selector).await.unwrap();
        assert!(pods.is_empty());
    }

    #[tokio::test]
    async fn test_count_running_pods() {
        let cluster = MockClusterReader::new();
        cluster.add_pod("default", &[("app", "web")], PodPhase::Running);
        cluster.add_pod("default", &[("app", "web")], PodPhase::Running);
        cluster.add_pod("default", &[("app", "web")], PodPhase::Pending);

        let selector = to_map(&[("app", "web")]);
        assert_eq!(cluster.count_running_pods("default", &selector).await, 2);
    }

    #[tokio::test]
    async fn test_count_running_pods_falls_back_to_zero() {
        let cluster = MockClusterReader::new();
        cluster.add_pod("default", &[("app", "web")], PodPhase::Running);
        cluster.set_pod_list_failure("default", true);

        let selector = to_map(&[("app", "web")]);
        assert!(cluster.list_pods("default", &selector).await.is_err());
        assert_eq!(cluster.count_running_pods("default", &selector).await, 0);

        cluster.set_pod_list_failure("default", false);
        assert_eq!(cluster.count_running_pods("default", &selector).await, 1);
    }

    #[tokio::test]
    async fn test_selector_failure_leaves_other_selectors() {
        let cluster = MockClusterReader::new();
        cluster.add_pod("default", &[("app", "web")], PodPhase::Running);
        cluster.add_pod("default", &[("app", "api")], PodPhase::Running);
        cluster.set_selector_pod_list_failure("default", &[("app", "web")], true);

        let web = to_map(&[("app", "web")]);
        let api = to_map(&[("app", "api")]);
        assert!(cluster.list_pods("default", &web).await.is_err());
        assert_eq!(cluster.count_running_pods("default", &api).await, 1);

        cluster.set_selector_pod_list_failure("default", &[("app", "web")], false);
        assert_eq!(cluster.count_running_pods("default", &web).await, 1);
    }

    #[tokio::test]
    async fn test_service_list_failure() {
        let cluster = MockClusterReader::new();
        cluster.add_service("web", "default", &[("app", "web")]);
        cluster.set_service_list_failure(true);
        assert!(cluster.list_services().await.is_err());

        cluster.set_service_list_failure(false);
        assert_eq!(cluster.list_services().await.unwrap().len(), 1);
    }
}
