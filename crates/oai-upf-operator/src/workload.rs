//!
//! # Workload container
//!
//! The workload container runs the UPF binary under a process supervisor (Pebble).
//! The operator only pushes files into it and declares the service layer.
//!

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::WorkloadError;
use crate::render::CONFIG_FILE_NAME;

pub const SERVICE_NAME: &str = "upf";
pub const BASE_CONFIG_PATH: &str = "/openair-spgwu-tiny/etc";
const UPF_BINARY: &str = "/openair-spgwu-tiny/bin/oai_spgwu";

/// Path of the rendered configuration inside the workload container
pub fn config_file_path() -> String {
    format!("{BASE_CONFIG_PATH}/{CONFIG_FILE_NAME}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    Merge,
    #[default]
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "override")]
    pub override_: Override,
    pub summary: String,
    pub command: String,
    #[serde(default)]
    pub startup: Startup,
}

/// Configuration layer handed to the process supervisor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

impl Layer {
    /// Apply `other` on top of this layer, service by service
    fn combine(&mut self, other: &Layer) {
        if !other.summary.is_empty() {
            self.summary.clone_from(&other.summary);
        }
        if !other.description.is_empty() {
            self.description.clone_from(&other.description);
        }
        for (name, service) in &other.services {
            self.services.insert(name.clone(), service.clone());
        }
    }
}

/// Flattened view of every layer, in label order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

/// The layer running the UPF from the rendered configuration
pub fn upf_layer() -> Layer {
    let service = Service {
        override_: Override::Replace,
        summary: SERVICE_NAME.to_owned(),
        command: format!("{UPF_BINARY} -c {} -o", config_file_path()),
        startup: Startup::Enabled,
    };
    Layer {
        summary: "upf layer".to_owned(),
        description: "pebble config layer for upf".to_owned(),
        services: BTreeMap::from([(SERVICE_NAME.to_owned(), service)]),
    }
}

/// Operations on the workload container
pub trait Workload {
    /// Whether the process supervisor answers
    fn can_connect(&self) -> bool;

    /// Write `content` to `path`, creating parent directories
    fn push(&mut self, path: &str, content: &str) -> Result<(), WorkloadError>;

    fn exists(&self, path: &str) -> bool;

    /// Add a layer under `label`, merging into an existing one when `combine` is set
    fn add_layer(&mut self, label: &str, layer: &Layer, combine: bool)
    -> Result<(), WorkloadError>;

    /// Bring services in line with the current plan
    fn replan(&mut self) -> Result<(), WorkloadError>;

    fn plan(&self) -> Result<Plan, WorkloadError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SupervisorState {
    #[serde(default)]
    layers: BTreeMap<String, Layer>,
    #[serde(default)]
    started: Vec<String>,
}

impl SupervisorState {
    fn plan(&self) -> Plan {
        let mut combined = Layer::default();
        for layer in self.layers.values() {
            combined.combine(layer);
        }
        Plan {
            services: combined.services,
        }
    }
}

/// Workload container mirrored into a local directory.
///
/// Container paths are resolved below `root`; the supervisor state lives in
/// `root/.pebble/state.yaml`. A missing root reads as an unreachable container.
#[derive(Debug, Clone)]
pub struct LocalWorkload {
    root: PathBuf,
}

impl LocalWorkload {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local location of a container path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Services started by the last replan
    pub fn started_services(&self) -> Result<Vec<String>, WorkloadError> {
        Ok(self.load_state()?.started)
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(".pebble").join("state.yaml")
    }

    fn load_state(&self) -> Result<SupervisorState, WorkloadError> {
        let path = self.state_path();
        let mut contents = String::new();
        match File::open(&path).and_then(|mut file| file.read_to_string(&mut contents)) {
            Ok(_) => Ok(serde_yaml::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SupervisorState::default()),
            Err(source) => Err(WorkloadError::Plan { path, source }),
        }
    }

    fn store_state(&self, state: &SupervisorState) -> Result<(), WorkloadError> {
        let path = self.state_path();
        let contents = serde_yaml::to_string(state)?;
        path.parent()
            .map(fs::create_dir_all)
            .transpose()
            .and_then(|_| fs::write(&path, contents))
            .map_err(|source| WorkloadError::Plan { path, source })
    }
}

impl Workload for LocalWorkload {
    fn can_connect(&self) -> bool {
        self.root.is_dir()
    }

    #[instrument(skip(self, content), fields(root = %self.root.display()))]
    fn push(&mut self, path: &str, content: &str) -> Result<(), WorkloadError> {
        if !self.can_connect() {
            return Err(WorkloadError::CannotConnect);
        }
        let target = self.resolve(path);
        target
            .parent()
            .map(fs::create_dir_all)
            .transpose()
            .and_then(|_| fs::write(&target, content))
            .map_err(|source| WorkloadError::Push {
                path: path.to_owned(),
                source,
            })?;
        debug!(bytes = content.len(), "pushed {path}");
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    #[instrument(skip(self, layer))]
    fn add_layer(
        &mut self,
        label: &str,
        layer: &Layer,
        combine: bool,
    ) -> Result<(), WorkloadError> {
        if !self.can_connect() {
            return Err(WorkloadError::CannotConnect);
        }
        let mut state = self.load_state()?;
        match state.layers.get_mut(label) {
            Some(existing) if combine => existing.combine(layer),
            Some(_) => return Err(WorkloadError::LayerExists(label.to_owned())),
            None => {
                state.layers.insert(label.to_owned(), layer.clone());
            }
        }
        self.store_state(&state)
    }

    fn replan(&mut self) -> Result<(), WorkloadError> {
        if !self.can_connect() {
            return Err(WorkloadError::CannotConnect);
        }
        let mut state = self.load_state()?;
        state.started = state
            .plan()
            .services
            .into_iter()
            .filter(|(_, service)| service.startup == Startup::Enabled)
            .map(|(name, _)| name)
            .collect();
        info!(services = ?state.started, "replanned");
        self.store_state(&state)
    }

    fn plan(&self) -> Result<Plan, WorkloadError> {
        Ok(self.load_state()?.plan())
    }
}
