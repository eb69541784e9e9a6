//! Cluster reader backed by the Kubernetes API server.

use super::{
    render_label_selector, ClusterError, ClusterReader, PodObservation, PodPhase,
    ServiceDescriptor,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment variable naming an out-of-cluster kubeconfig file.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Builds a client from the standard credential sources.
///
/// `KUBECONFIG` wins when set. Otherwise the in-cluster service account is
/// tried, then `~/.kube/config`.
pub async fn connect() -> Result<KubeClusterReader, ClusterError> {
    let kubeconfig = std::env::var_os(KUBECONFIG_ENV)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);
    connect_with(kubeconfig).await
}

/// Builds a client from an explicit kubeconfig path, or from the in-cluster
/// and home-directory fallbacks when `kubeconfig` is `None`.
pub async fn connect_with(kubeconfig: Option<PathBuf>) -> Result<KubeClusterReader, ClusterError> {
    let config = match kubeconfig {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using kubeconfig from {KUBECONFIG_ENV}");
            let kubeconfig = Kubeconfig::read_from(&path)
                .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))?;
            from_kubeconfig(kubeconfig).await?
        }
        None => match Config::incluster() {
            Ok(config) => {
                tracing::info!("Using in-cluster configuration");
                config
            }
            Err(in_cluster) => {
                tracing::debug!(error = %in_cluster, "In-cluster configuration unavailable");
                let kubeconfig = Kubeconfig::read().map_err(|e| {
                    ClusterError::Config(format!(
                        "not running in a cluster ({in_cluster}) and no kubeconfig found ({e})"
                    ))
                })?;
                tracing::info!("Using kubeconfig from home directory");
                from_kubeconfig(kubeconfig).await?
            }
        },
    };

    let client = Client::try_from(config)?;
    Ok(KubeClusterReader::new(client))
}

async fn from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Config, ClusterError> {
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| ClusterError::Config(e.to_string()))
}

/// [`ClusterReader`] issuing list calls through a [`kube::Client`].
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    /// Wraps an already configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClusterError> {
        let services: Api<Service> = Api::all(self.client.clone());
        let list = services.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().filter_map(service_descriptor).collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<PodObservation>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&render_label_selector(selector));
        let list = pods.list(&params).await?;
        Ok(list
            .items
            .into_iter()
            .map(|pod| pod_observation(pod, namespace))
            .collect())
    }
}

fn service_descriptor(service: Service) -> Option<ServiceDescriptor> {
    let (Some(name), Some(namespace)) = (service.metadata.name, service.metadata.namespace) else {
        tracing::debug!("Skipping service without name or namespace");
        return None;
    };
    let selector = service
        .spec
        .and_then(|spec| spec.selector)
        .unwrap_or_default();
    Some(ServiceDescriptor {
        name,
        namespace,
        selector,
    })
}

fn pod_observation(pod: Pod, namespace: &str) -> PodObservation {
    let phase = pod
        .status
        .and_then(|status| status.phase)
        .map(|phase| PodPhase::from(phase.as_str()))
        .unwrap_or(PodPhase::Unknown);
    PodObservation {
        namespace: pod.metadata.namespace.unwrap_or_else(|| namespace.to_string()),
        phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodStatus, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn service(name: Option<&str>, selector: Option<BTreeMap<String, String>>) -> Service {
        Service {
            metadata: ObjectMeta {
                name: name.map(str::to_string),
                namespace: Some("default".to_string()),
                ..ObjectMeta::default()
            },
            spec: Some(ServiceSpec {
                selector,
                ..ServiceSpec::default()
            }),
            ..Service::default()
        }
    }

    #[test]
    fn test_service_descriptor_keeps_selector() {
        let selector = BTreeMap::from([("app".to_string(), "web".to_string())]);
        let descriptor = service_descriptor(service(Some("web"), Some(selector.clone()))).unwrap();
        assert_eq!(descriptor, ServiceDescriptor::new("web", "default", selector));
    }

    #[test]
    fn test_service_descriptor_missing_selector_is_empty() {
        let descriptor = service_descriptor(service(Some("batch"), None)).unwrap();
        assert!(!descriptor.has_selector());
    }

    #[test]
    fn test_service_descriptor_requires_name() {
        assert!(service_descriptor(service(None, None)).is_none());
    }

    #[test]
    fn test_pod_observation_phase() {
        let pod = Pod {
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        let observation = pod_observation(pod, "default");
        assert!(observation.is_running());
        assert_eq!(observation.namespace, "default");

        let observation = pod_observation(Pod::default(), "default");
        assert_eq!(observation.phase, PodPhase::Unknown);
    }

    #[tokio::test]
    async fn test_connect_with_missing_kubeconfig() {
        let result = connect_with(Some(PathBuf::from("/nonexistent/kubeconfig"))).await;
        assert!(matches!(result, Err(ClusterError::Config(_))));
    }
}
