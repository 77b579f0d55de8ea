use std::io::Error as IoError;
use std::path::PathBuf;
use std::process::ExitStatus;

use fiveg_interface::RelationError;

/// The types of errors that can occur while operating the UPF
#[derive(thiserror::Error, Debug)]
pub enum OperatorError {
    /// Reading or publishing relation data failed
    #[error("Relation data error")]
    Relation(#[from] RelationError),
    /// The configuration template could not be rendered
    #[error("Failed to render UPF configuration")]
    Render(#[from] RenderError),
    /// The workload container rejected a request
    #[error("Workload container error")]
    Workload(#[from] WorkloadError),
    /// An error occurred with the Kubernetes API
    #[error("Kubernetes error")]
    K8(#[from] K8Error),
    /// The operator configuration is invalid
    #[error("Operator configuration error")]
    Config(#[from] ConfigError),
}

/// Errors from the configuration template
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// The bundled template is malformed or references unknown filters
    #[error("Template definition error")]
    TemplateDefinition(#[from] minijinja::Error),
}

/// Errors from the workload container surface
#[derive(thiserror::Error, Debug)]
pub enum WorkloadError {
    /// The process supervisor could not be reached
    #[error("Cannot connect to workload container")]
    CannotConnect,
    /// Failed to write a file into the container
    #[error("Failed to push {path}")]
    Push { path: String, source: IoError },
    /// Failed to read or store the service plan
    #[error("Failed to update plan at {path:?}")]
    Plan { path: PathBuf, source: IoError },
    /// A layer with this label exists and combining was not requested
    #[error("Layer {0} already exists")]
    LayerExists(String),
    #[error("Invalid plan document")]
    PlanFormat(#[from] serde_yaml::Error),
}

/// Errors that may occur while talking to Kubernetes
#[derive(thiserror::Error, Debug)]
pub enum K8Error {
    /// The StatefulSet carries no pod template spec
    #[error("Could not find `spec` in the {0} statefulset")]
    MissingSpec(String),
    /// The pod template does not have the expected workload container
    #[error("Could not find workload container at index {index} in the {name} statefulset")]
    MissingContainer { name: String, index: usize },
    /// Failed to (de)serialize a Kubernetes object
    #[error("Kubernetes object serialization error")]
    Serialization(#[from] serde_json::Error),
    /// An IO error occurred while running kubectl
    #[error(transparent)]
    Io(#[from] IoError),
    /// kubectl exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Errors loading the operator configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}")]
    Read { path: PathBuf, source: IoError },
    #[error("Invalid config file")]
    Parse(#[from] serde_yaml::Error),
    /// A required setting is empty
    #[error("Missing required config option {0}")]
    MissingRequiredConfig(&'static str),
}
