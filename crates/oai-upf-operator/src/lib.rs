//!
//! # OAI 5G UPF operator
//!
//! Deploys the OpenAirInterface User Plane Function and wires it to the Network
//! Repository Function over the `fiveg-nrf` relation. Configuration is rendered once the
//! NRF has published where it can be reached, and the UPF advertises itself to the
//! session management side over `fiveg-upf`.
//!

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod k8;
pub mod render;
pub mod status;
pub mod workload;

pub use config::{ModelInfo, UpfConfig};
pub use controller::{Host, Outcome, Trigger, UpfOperator, reconcile};
pub use error::OperatorError;
pub use status::{UnitStatus, WorkloadState};
