use std::process::Command;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::K8Error;

use super::{StatefulSet, StatefulSetClient};

/// Client shelling out to `kubectl` with the ambient kubeconfig
#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: String,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, K8Error> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        debug!(?cmd, "running");
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(K8Error::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(output.stdout)
    }

    fn merge_patch(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        patch: &Value,
    ) -> Result<(), K8Error> {
        let body = serde_json::to_string(patch)?;
        self.run(&[
            "patch",
            kind,
            name,
            "--namespace",
            namespace,
            "--type",
            "merge",
            "--patch",
            &body,
        ])?;
        Ok(())
    }
}

impl StatefulSetClient for KubectlClient {
    #[instrument(skip(self))]
    fn get_statefulset(&self, name: &str, namespace: &str) -> Result<StatefulSet, K8Error> {
        let stdout = self.run(&[
            "get",
            "statefulset",
            name,
            "--namespace",
            namespace,
            "--output",
            "json",
        ])?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    #[instrument(skip(self, patch))]
    fn merge_patch_statefulset(
        &self,
        name: &str,
        namespace: &str,
        patch: &Value,
    ) -> Result<(), K8Error> {
        self.merge_patch("statefulset", name, namespace, patch)
    }

    #[instrument(skip(self, patch))]
    fn merge_patch_service(
        &self,
        name: &str,
        namespace: &str,
        patch: &Value,
    ) -> Result<(), K8Error> {
        self.merge_patch("service", name, namespace, patch)
    }
}
