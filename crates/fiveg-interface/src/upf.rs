//!
//! # `fiveg-upf` interface
//!
//! The User Plane Function advertises its address to the session management side.
//!

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::RelationError;
use crate::provides::CapabilityProvides;
use crate::requires::{CapabilityAvailable, CapabilityRequires, field_accessors};
use crate::schema::{CapabilityPayload, field};
use crate::store::{RelationId, RelationRecord, RelationStore};

pub const UPF_IPV4_ADDRESS: &str = "upf_ipv4_address";
pub const UPF_FQDN: &str = "upf_fqdn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpfInfo {
    pub ipv4_address: String,
    pub fqdn: String,
}

impl CapabilityPayload for UpfInfo {
    const FIELDS: &'static [&'static str] = &[UPF_IPV4_ADDRESS, UPF_FQDN];
    const CAPABILITY: &'static str = "upf";

    fn from_record(record: &RelationRecord) -> Self {
        Self {
            ipv4_address: field(record, UPF_IPV4_ADDRESS),
            fqdn: field(record, UPF_FQDN),
        }
    }

    fn to_record(&self) -> RelationRecord {
        RelationRecord::from([
            (UPF_IPV4_ADDRESS.to_owned(), self.ipv4_address.clone()),
            (UPF_FQDN.to_owned(), self.fqdn.clone()),
        ])
    }
}

pub type UpfAvailable = CapabilityAvailable<UpfInfo>;

/// Requirer of the UPF capability
#[derive(Debug)]
pub struct UpfRequires {
    requires: CapabilityRequires<UpfInfo>,
}

impl UpfRequires {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            requires: CapabilityRequires::new(relation_name),
        }
    }

    field_accessors! {
        upf_ipv4_address, upf_ipv4_address_available => UPF_IPV4_ADDRESS;
        upf_fqdn, upf_fqdn_available => UPF_FQDN;
    }
}

impl Deref for UpfRequires {
    type Target = CapabilityRequires<UpfInfo>;

    fn deref(&self) -> &Self::Target {
        &self.requires
    }
}

impl DerefMut for UpfRequires {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.requires
    }
}

/// Provider of the UPF capability
#[derive(Debug)]
pub struct UpfProvides {
    provides: CapabilityProvides<UpfInfo>,
}

impl UpfProvides {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            provides: CapabilityProvides::new(relation_name),
        }
    }

    pub fn relation_name(&self) -> &str {
        self.provides.relation_name()
    }

    /// Sets UPF information in relation data
    pub fn set_upf_information(
        &self,
        store: &mut dyn RelationStore,
        info: &UpfInfo,
        relation_id: RelationId,
    ) -> Result<(), RelationError> {
        self.provides.publish(store, relation_id, info)
    }
}
