use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_APP_NAME: &str = "oai-5g-upf";

/// User facing settings of the UPF operator.
///
/// Keys are kebab-case; numeric settings are kept as strings because they are only ever
/// written into the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UpfConfig {
    #[serde(deserialize_with = "scalar")]
    pub gw_id: String,
    #[serde(deserialize_with = "scalar")]
    pub mnc: String,
    #[serde(deserialize_with = "scalar")]
    pub mcc: String,
    #[serde(deserialize_with = "scalar")]
    pub realm: String,
    #[serde(deserialize_with = "scalar")]
    pub sgw_s1u_interface: String,
    #[serde(deserialize_with = "scalar")]
    pub thread_s1u_priority: String,
    #[serde(deserialize_with = "scalar")]
    pub sgw_sx_interface: String,
    #[serde(deserialize_with = "scalar")]
    pub thread_sx_priority: String,
    #[serde(deserialize_with = "scalar")]
    pub pgw_sgi_interface: String,
    #[serde(deserialize_with = "scalar")]
    pub thread_sgi_priority: String,
    #[serde(deserialize_with = "scalar")]
    pub network_ue_ip: String,
    /// Address advertised to the session management side over `fiveg-upf`
    #[serde(deserialize_with = "scalar")]
    pub upf_ipv4_address: String,
}

impl Default for UpfConfig {
    fn default() -> Self {
        Self {
            gw_id: "1".to_owned(),
            mnc: "99".to_owned(),
            mcc: "208".to_owned(),
            realm: "3gpp.org".to_owned(),
            sgw_s1u_interface: "eth0".to_owned(),
            thread_s1u_priority: "88".to_owned(),
            sgw_sx_interface: "eth0".to_owned(),
            thread_sx_priority: "88".to_owned(),
            pgw_sgi_interface: "eth0".to_owned(),
            thread_sgi_priority: "98".to_owned(),
            network_ue_ip: "12.1.1.0/24".to_owned(),
            upf_ipv4_address: "127.0.0.1".to_owned(),
        }
    }
}

impl UpfConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        let config = Self::from_yaml(&contents)?;

        debug!("Using operator config {config:#?}");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("gw-id", &self.gw_id),
            ("mnc", &self.mnc),
            ("mcc", &self.mcc),
            ("realm", &self.realm),
            ("sgw-s1u-interface", &self.sgw_s1u_interface),
            ("sgw-sx-interface", &self.sgw_sx_interface),
            ("pgw-sgi-interface", &self.pgw_sgi_interface),
            ("network-ue-ip", &self.network_ue_ip),
        ];
        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((key, _)) => Err(ConfigError::MissingRequiredConfig(*key)),
            None => Ok(()),
        }
    }

    /// FQDN of the gateway for 4G
    pub fn spgw_fqdn(&self) -> String {
        format!(
            "gw{}.spgw.node.epc.mnc{}.mcc{}.{}",
            self.gw_id, self.mnc, self.mcc, self.realm
        )
    }
}

/// Where the operator is deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelInfo {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Model name, which is also the Kubernetes namespace
    pub model_name: String,
}

impl ModelInfo {
    pub fn new(app_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            model_name: model_name.into(),
        }
    }

    /// In-cluster FQDN of the UPF service
    pub fn upf_fqdn(&self) -> String {
        format!("{}.{}.svc.cluster.local", self.app_name, self.model_name)
    }
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_owned()
}

/// Accept any YAML scalar and keep its textual form
fn scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(value) => value,
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
        Scalar::Bool(value) => value.to_string(),
    })
}
