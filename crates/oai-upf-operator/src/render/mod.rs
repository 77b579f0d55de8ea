//!
//! # UPF configuration rendering
//!
//! Substitutes a [`ConfigContext`] into the bundled `spgw_u.conf` layout.
//!

use minijinja::Environment;
use serde::Serialize;
use tracing::{debug, instrument};

use fiveg_interface::nrf::NrfInfo;

use crate::config::{ModelInfo, UpfConfig};
use crate::error::RenderError;

pub const CONFIG_FILE_NAME: &str = "spgw_u.conf";

const TEMPLATE: &str = include_str!("../../templates/spgw_u.conf.j2");

/// Network slice advertised to the NRF
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSlice {
    pub nssai_sst: String,
    pub nssai_sd: String,
    pub dnn: String,
}

impl Default for NetworkSlice {
    fn default() -> Self {
        Self {
            nssai_sst: "1".to_owned(),
            nssai_sd: "1".to_owned(),
            dnn: "oai".to_owned(),
        }
    }
}

/// Every value the configuration file is made of
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigContext {
    pub spgw_fqdn: String,
    pub instance: String,
    pub pid_directory: String,
    pub sgw_s1u_interface: String,
    pub thread_s1u_priority: String,
    pub sgw_sx_interface: String,
    pub thread_sx_priority: String,
    pub pgw_sgi_interface: String,
    pub thread_sgi_priority: String,
    pub network_ue_ip: String,
    pub spgw_c0_ip_address: String,
    pub bypass_ul_pfcp_rules: String,
    pub enable_5g_features: String,
    pub register_nrf: String,
    pub use_fqdn_nrf: String,
    pub upf_fqdn_5g: String,
    pub nrf_ipv4_address: String,
    pub nrf_port: String,
    pub nrf_api_version: String,
    pub nrf_fqdn: String,
    pub upf_info: [NetworkSlice; 4],
}

impl ConfigContext {
    /// Combine local settings with the negotiated NRF endpoint
    pub fn new(config: &UpfConfig, model: &ModelInfo, nrf: &NrfInfo) -> Self {
        Self {
            spgw_fqdn: config.spgw_fqdn(),
            instance: "0".to_owned(),
            pid_directory: "/var/run".to_owned(),
            sgw_s1u_interface: config.sgw_s1u_interface.clone(),
            thread_s1u_priority: config.thread_s1u_priority.clone(),
            sgw_sx_interface: config.sgw_sx_interface.clone(),
            thread_sx_priority: config.thread_sx_priority.clone(),
            pgw_sgi_interface: config.pgw_sgi_interface.clone(),
            thread_sgi_priority: config.thread_sgi_priority.clone(),
            network_ue_ip: config.network_ue_ip.clone(),
            spgw_c0_ip_address: "127.0.0.1".to_owned(),
            bypass_ul_pfcp_rules: "no".to_owned(),
            enable_5g_features: "yes".to_owned(),
            register_nrf: "yes".to_owned(),
            use_fqdn_nrf: "yes".to_owned(),
            upf_fqdn_5g: model.upf_fqdn(),
            nrf_ipv4_address: nrf.ipv4_address.clone(),
            nrf_port: nrf.port.clone(),
            nrf_api_version: nrf.api_version.clone(),
            nrf_fqdn: nrf.fqdn.clone(),
            upf_info: Default::default(),
        }
    }
}

/// Renders `spgw_u.conf`.
///
/// The template is compiled once; rendering is pure and gives identical bytes for
/// identical contexts. Callers must only pass a context built from complete NRF data.
pub struct ConfigRenderer {
    env: Environment<'static>,
}

impl ConfigRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Self::with_template(TEMPLATE)
    }

    /// Renderer for an alternative layout with the same context fields
    pub fn with_template(source: &'static str) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(CONFIG_FILE_NAME, source)?;
        Ok(Self { env })
    }

    #[instrument(skip_all)]
    pub fn render(&self, context: &ConfigContext) -> Result<String, RenderError> {
        let template = self.env.get_template(CONFIG_FILE_NAME)?;
        let content = template.render(context)?;
        debug!(bytes = content.len(), "rendered {}", CONFIG_FILE_NAME);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nrf() -> NrfInfo {
        NrfInfo {
            ipv4_address: "1.2.3.4".into(),
            fqdn: "nrf.example.com".into(),
            port: "81".into(),
            api_version: "v1".into(),
        }
    }

    fn context() -> ConfigContext {
        ConfigContext::new(
            &UpfConfig::default(),
            &ModelInfo::new("oai-5g-upf", "whatever"),
            &nrf(),
        )
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ConfigRenderer::new().expect("template should compile");

        let first = renderer.render(&context()).unwrap();
        let second = renderer.render(&context()).unwrap();
        let other_renderer = ConfigRenderer::new().unwrap().render(&context()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, other_renderer);
    }

    #[test]
    fn test_render_substitutes_context() {
        //given
        let renderer = ConfigRenderer::new().unwrap();
        let mut context = context();
        context.sgw_sx_interface = "net1".into();
        context.thread_sgi_priority = "77".into();

        //when
        let content = renderer.render(&context).unwrap();

        //then
        assert!(content.contains(r#"FQDN = "gw1.spgw.node.epc.mnc99.mcc208.3gpp.org"; # FQDN for 4G"#));
        assert!(content.contains(r#"INTERFACE_NAME         = "net1"; # STRING, interface name"#));
        assert!(content.contains("SCHED_PRIORITY = 77;"));
        assert!(content.contains(r#"IPV4_ADDRESS = "1.2.3.4";"#));
        assert!(content.contains("PORT         = 81;"));
        assert!(content.contains(r#"API_VERSION  = "v1";"#));
        assert!(content.contains(r#"FQDN = "nrf.example.com";"#));
        assert!(content.contains(r#"UPF_FQDN_5G  = "oai-5g-upf.whatever.svc.cluster.local";"#));
        assert!(content.ends_with("};"));
    }

    #[test]
    fn test_slices_are_rendered() {
        let renderer = ConfigRenderer::new().unwrap();
        let mut context = context();
        context.upf_info[3] = NetworkSlice {
            nssai_sst: "2".into(),
            nssai_sd: "abc".into(),
            dnn: "internet".into(),
        };

        let content = renderer.render(&context).unwrap();

        let slices: Vec<&str> = content
            .lines()
            .filter(|line| line.contains("NSSAI_SST"))
            .collect();
        assert_eq!(slices.len(), 4);
        assert!(slices[0].ends_with(r#"{ NSSAI_SST = 1; NSSAI_SD = "1";  DNN_LIST = ({DNN = "oai";}); },"#));
        assert!(slices[3].ends_with(r#"{ NSSAI_SST = 2; NSSAI_SD = "abc";  DNN_LIST = ({DNN = "internet";}); }"#));
    }

    #[test]
    fn test_broken_template_is_a_definition_error() {
        let result = ConfigRenderer::with_template("{% if %}");

        assert!(matches!(result, Err(RenderError::TemplateDefinition(_))));
    }
}
