use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of the unit as reported to the orchestration host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Unknown,
    Waiting(String),
    Blocked(String),
    Active,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Waiting(message) => write!(f, "waiting: {message}"),
            Self::Blocked(message) => write!(f, "blocked: {message}"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Where reconciliation of the workload stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadState {
    WaitingForRuntime,
    WaitingForRelation,
    WaitingForCapability,
    Active,
}

impl WorkloadState {
    pub fn unit_status(&self) -> UnitStatus {
        match self {
            Self::WaitingForRuntime => {
                UnitStatus::Waiting("Waiting for Pebble in workload container".to_owned())
            }
            Self::WaitingForRelation => {
                UnitStatus::Blocked("Waiting for relation to NRF to be created".to_owned())
            }
            Self::WaitingForCapability => UnitStatus::Waiting(
                "Waiting for NRF data to be available in relation data".to_owned(),
            ),
            Self::Active => UnitStatus::Active,
        }
    }
}
