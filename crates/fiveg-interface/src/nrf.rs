//!
//! # `fiveg-nrf` interface
//!
//! The Network Repository Function advertises where it can be reached.
//!

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::RelationError;
use crate::provides::CapabilityProvides;
use crate::requires::{CapabilityAvailable, CapabilityRequires, field_accessors};
use crate::schema::{CapabilityPayload, field};
use crate::store::{RelationId, RelationRecord, RelationStore};

pub const NRF_IPV4_ADDRESS: &str = "nrf_ipv4_address";
pub const NRF_FQDN: &str = "nrf_fqdn";
pub const NRF_PORT: &str = "nrf_port";
pub const NRF_API_VERSION: &str = "nrf_api_version";

/// NRF endpoint, every value kept as published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrfInfo {
    pub ipv4_address: String,
    pub fqdn: String,
    pub port: String,
    pub api_version: String,
}

impl CapabilityPayload for NrfInfo {
    const FIELDS: &'static [&'static str] = &[NRF_IPV4_ADDRESS, NRF_FQDN, NRF_PORT, NRF_API_VERSION];
    const CAPABILITY: &'static str = "nrf";

    fn from_record(record: &RelationRecord) -> Self {
        Self {
            ipv4_address: field(record, NRF_IPV4_ADDRESS),
            fqdn: field(record, NRF_FQDN),
            port: field(record, NRF_PORT),
            api_version: field(record, NRF_API_VERSION),
        }
    }

    fn to_record(&self) -> RelationRecord {
        RelationRecord::from([
            (NRF_IPV4_ADDRESS.to_owned(), self.ipv4_address.clone()),
            (NRF_FQDN.to_owned(), self.fqdn.clone()),
            (NRF_PORT.to_owned(), self.port.clone()),
            (NRF_API_VERSION.to_owned(), self.api_version.clone()),
        ])
    }
}

pub type NrfAvailable = CapabilityAvailable<NrfInfo>;

/// Requirer of the NRF capability
#[derive(Debug)]
pub struct NrfRequires {
    requires: CapabilityRequires<NrfInfo>,
}

impl NrfRequires {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            requires: CapabilityRequires::new(relation_name),
        }
    }

    field_accessors! {
        nrf_ipv4_address, nrf_ipv4_address_available => NRF_IPV4_ADDRESS;
        nrf_fqdn, nrf_fqdn_available => NRF_FQDN;
        nrf_port, nrf_port_available => NRF_PORT;
        nrf_api_version, nrf_api_version_available => NRF_API_VERSION;
    }
}

impl Deref for NrfRequires {
    type Target = CapabilityRequires<NrfInfo>;

    fn deref(&self) -> &Self::Target {
        &self.requires
    }
}

impl DerefMut for NrfRequires {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.requires
    }
}

/// Provider of the NRF capability, used by the NRF operator
#[derive(Debug)]
pub struct NrfProvides {
    provides: CapabilityProvides<NrfInfo>,
}

impl NrfProvides {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            provides: CapabilityProvides::new(relation_name),
        }
    }

    /// Sets NRF information in relation data
    pub fn set_nrf_information(
        &self,
        store: &mut dyn RelationStore,
        info: &NrfInfo,
        relation_id: RelationId,
    ) -> Result<(), RelationError> {
        self.provides.publish(store, relation_id, info)
    }
}
