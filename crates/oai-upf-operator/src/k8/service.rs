use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tracing::{debug, info, instrument};

use crate::error::K8Error;

use super::StatefulSetClient;

fn udp_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_owned()),
        port,
        protocol: Some("UDP".to_owned()),
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

/// PFCP (N4) and GTP-U (S1-U/N3) ports
pub fn upf_service_ports() -> Vec<ServicePort> {
    vec![udp_port("oai-spgwu-tiny", 8805), udp_port("s1u", 2152)]
}

/// Exposes ports on the application's Service
pub struct ServicePortsPatcher<'a> {
    client: &'a dyn StatefulSetClient,
    namespace: String,
}

impl<'a> ServicePortsPatcher<'a> {
    pub fn new(client: &'a dyn StatefulSetClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Replace the ports of service `name`
    #[instrument(skip(self, ports), fields(namespace = %self.namespace))]
    pub fn patch(&self, name: &str, ports: &[ServicePort]) -> Result<(), K8Error> {
        let service = Service {
            spec: Some(ServiceSpec {
                ports: Some(ports.to_vec()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let patch = serde_json::to_value(&service)?;
        debug!(%patch, "patching service");
        self.client
            .merge_patch_service(name, &self.namespace, &patch)?;
        info!(ports = ports.len(), "service {name} ports set");
        Ok(())
    }
}
