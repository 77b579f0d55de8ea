use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::PodSpec;
use tracing::{debug, info, instrument};

use crate::error::K8Error;

use super::StatefulSetClient;

/// The workload container follows the operator container
pub const WORKLOAD_CONTAINER_INDEX: usize = 1;

fn pod_spec<'s>(statefulset: &'s StatefulSet, name: &str) -> Result<&'s PodSpec, K8Error> {
    statefulset
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .ok_or_else(|| K8Error::MissingSpec(name.to_owned()))
}

fn pod_spec_mut<'s>(
    statefulset: &'s mut StatefulSet,
    name: &str,
) -> Result<&'s mut PodSpec, K8Error> {
    statefulset
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
        .ok_or_else(|| K8Error::MissingSpec(name.to_owned()))
}

/// Runs the UPF as root in a privileged workload container.
///
/// The UPF manipulates network interfaces of its pod, which needs both settings.
pub struct StatefulSetPatcher<'a> {
    client: &'a dyn StatefulSetClient,
    namespace: String,
}

impl<'a> StatefulSetPatcher<'a> {
    pub fn new(client: &'a dyn StatefulSetClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub fn is_patched(&self, name: &str) -> Result<bool, K8Error> {
        let statefulset = self.client.get_statefulset(name, &self.namespace)?;
        let pod = pod_spec(&statefulset, name)?;

        let pod_context = pod.security_context.clone().unwrap_or_default();
        if pod_context.run_as_user != Some(0) {
            info!("runAsUser is not set to 0");
            return Ok(false);
        }
        if pod_context.run_as_group != Some(0) {
            info!("runAsGroup is not set to 0");
            return Ok(false);
        }

        let privileged = pod
            .containers
            .get(WORKLOAD_CONTAINER_INDEX)
            .and_then(|container| container.security_context.as_ref())
            .and_then(|context| context.privileged)
            .unwrap_or(false);
        if !privileged {
            info!("workload container is not privileged");
            return Ok(false);
        }

        Ok(true)
    }

    /// Merge patch the StatefulSet spec with the root and privileged settings
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub fn patch(&self, name: &str) -> Result<(), K8Error> {
        let current = self.client.get_statefulset(name, &self.namespace)?;
        // metadata and status stay out of the patch
        let mut desired = StatefulSet {
            spec: current.spec,
            ..Default::default()
        };
        let pod = pod_spec_mut(&mut desired, name)?;

        let pod_context = pod.security_context.get_or_insert_with(Default::default);
        pod_context.run_as_user = Some(0);
        pod_context.run_as_group = Some(0);

        let container = pod
            .containers
            .get_mut(WORKLOAD_CONTAINER_INDEX)
            .ok_or_else(|| K8Error::MissingContainer {
                name: name.to_owned(),
                index: WORKLOAD_CONTAINER_INDEX,
            })?;
        container
            .security_context
            .get_or_insert_with(Default::default)
            .privileged = Some(true);

        let patch = serde_json::to_value(&desired)?;
        debug!(%patch, "patching statefulset");
        self.client
            .merge_patch_statefulset(name, &self.namespace, &patch)?;
        info!("{name} statefulset patched with privileged workload container");
        Ok(())
    }

    /// Patch unless already patched, returns whether a patch was sent
    pub fn ensure_patched(&self, name: &str) -> Result<bool, K8Error> {
        if self.is_patched(name)? {
            debug!("statefulset {name} already patched");
            return Ok(false);
        }
        self.patch(name)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use serde_json::json;

    use super::*;
    use crate::k8::MockStatefulSetClient;

    fn statefulset(patched: bool) -> StatefulSet {
        let mut value = json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": {
                "name": "oai-5g-upf",
                "namespace": "whatever",
                "resourceVersion": "4242"
            },
            "spec": {
                "serviceName": "oai-5g-upf-endpoints",
                "selector": { "matchLabels": { "app.kubernetes.io/name": "oai-5g-upf" } },
                "template": {
                    "spec": {
                        "containers": [
                            { "name": "charm", "image": "operator" },
                            { "name": "upf", "image": "oai-spgwu-tiny" }
                        ]
                    }
                }
            },
            "status": { "replicas": 1 }
        });
        if patched {
            value["spec"]["template"]["spec"]["securityContext"] =
                json!({ "runAsUser": 0, "runAsGroup": 0 });
            value["spec"]["template"]["spec"]["containers"][1]["securityContext"] =
                json!({ "privileged": true });
        }
        serde_json::from_value(value).expect("valid statefulset")
    }

    #[test]
    fn test_is_patched() {
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .with(eq("oai-5g-upf"), eq("whatever"))
            .returning(|_, _| Ok(statefulset(true)));
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        assert!(patcher.is_patched("oai-5g-upf").unwrap());
    }

    #[test]
    fn test_is_not_patched() {
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .returning(|_, _| Ok(statefulset(false)));
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        assert!(!patcher.is_patched("oai-5g-upf").unwrap());
    }

    #[test]
    fn test_patch_sets_security_contexts() {
        //given
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .returning(|_, _| Ok(statefulset(false)));
        client
            .expect_merge_patch_statefulset()
            .withf(|name, namespace, patch| {
                let pod = &patch["spec"]["template"]["spec"];
                name == "oai-5g-upf"
                    && namespace == "whatever"
                    && pod["securityContext"] == json!({ "runAsUser": 0, "runAsGroup": 0 })
                    && pod["containers"][1]["securityContext"] == json!({ "privileged": true })
                    && pod["containers"][0].get("securityContext").is_none()
                    && pod["containers"][1]["image"] == "oai-spgwu-tiny"
                    && patch["spec"]["serviceName"] == "oai-5g-upf-endpoints"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        //when
        let patched = patcher.ensure_patched("oai-5g-upf").unwrap();

        //then
        assert!(patched);
    }

    #[test]
    fn test_patch_leaves_out_metadata_and_status() {
        //given
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .returning(|_, _| Ok(statefulset(false)));
        client
            .expect_merge_patch_statefulset()
            .withf(|_, _, patch| {
                patch["metadata"] == json!({})
                    && patch.get("status").is_none()
                    && patch["kind"] == "StatefulSet"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        //when
        let result = patcher.patch("oai-5g-upf");

        //then
        assert!(result.is_ok());
    }

    #[test]
    fn test_already_patched_is_left_alone() {
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .returning(|_, _| Ok(statefulset(true)));
        client.expect_merge_patch_statefulset().never();
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        assert!(!patcher.ensure_patched("oai-5g-upf").unwrap());
    }

    #[test]
    fn test_missing_spec() {
        let mut client = MockStatefulSetClient::new();
        client
            .expect_get_statefulset()
            .returning(|_, _| Ok(StatefulSet::default()));
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        let err = patcher.is_patched("oai-5g-upf").unwrap_err();

        assert!(matches!(err, K8Error::MissingSpec(name) if name == "oai-5g-upf"));
    }

    #[test]
    fn test_missing_workload_container() {
        let mut client = MockStatefulSetClient::new();
        client.expect_get_statefulset().returning(|_, _| {
            let mut statefulset = statefulset(false);
            if let Some(pod) = statefulset
                .spec
                .as_mut()
                .and_then(|spec| spec.template.spec.as_mut())
            {
                pod.containers.truncate(1);
            }
            Ok(statefulset)
        });
        let patcher = StatefulSetPatcher::new(&client, "whatever");

        let err = patcher.patch("oai-5g-upf").unwrap_err();

        assert!(matches!(err, K8Error::MissingContainer { index: 1, .. }));
    }
}
