mod kubectl;
mod service;
mod statefulset;

pub use kubectl::KubectlClient;
pub use service::{ServicePortsPatcher, upf_service_ports};
pub use statefulset::{StatefulSetPatcher, WORKLOAD_CONTAINER_INDEX};

pub use k8s_openapi::api::apps::v1::StatefulSet;

use serde_json::Value;

use crate::error::K8Error;

/// Subset of the Kubernetes API the operator needs
#[cfg_attr(test, mockall::automock)]
pub trait StatefulSetClient {
    fn get_statefulset(&self, name: &str, namespace: &str) -> Result<StatefulSet, K8Error>;

    /// Apply a JSON merge patch to a StatefulSet
    fn merge_patch_statefulset(
        &self,
        name: &str,
        namespace: &str,
        patch: &Value,
    ) -> Result<(), K8Error>;

    /// Apply a JSON merge patch to a Service
    fn merge_patch_service(&self, name: &str, namespace: &str, patch: &Value)
    -> Result<(), K8Error>;
}
