//! Read-only access to the cluster control plane.
//!
//! Only two calls are ever issued: list every Service in the cluster, and
//! list the Pods of one namespace that match a label selector. Nothing is
//! written back.

mod client;
mod mock;
mod reader;
mod selector;

pub use client::{connect, connect_with, KubeClusterReader, KUBECONFIG_ENV};
pub use mock::MockClusterReader;
pub use reader::{
    pod_query_fallback, ClusterError, ClusterReader, PodObservation, PodPhase, ServiceDescriptor,
};
pub use selector::render_label_selector;
