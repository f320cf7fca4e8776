//! Docker CLI backend.
//!
//! Every operation is a separate `docker` invocation whose outcome is read
//! from its exit status. `docker run` stays attached so the container's
//! output reaches the operator's terminal.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

use crp_common::error::{CrpError, Result};

use super::{ContainerBackend, ContainerProcess, ProcessExit};
use crate::spec::RunSpec;

/// Backend driving the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    binary: PathBuf,
}

impl DockerBackend {
    /// Finds `docker` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if no `docker` binary can be found.
    pub fn locate() -> Result<Self> {
        let binary = which::which("docker").map_err(|e| CrpError::Engine {
            command: "docker".into(),
            message: format!("not found on PATH: {e}"),
        })?;
        tracing::debug!(binary = %binary.display(), "using docker client");
        Ok(Self { binary })
    }

    /// Uses an explicit client binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the client binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CrpError::Io {
                path: self.binary.clone(),
                source,
            })
    }

    fn succeeds(&self, args: &[&str]) -> Result<bool> {
        Ok(self.output(args)?.status.success())
    }
}

fn is_running(status: &[u8]) -> bool {
    String::from_utf8_lossy(status).trim() == "running"
}

impl ContainerBackend for DockerBackend {
    fn image_exists(&self, image: &str) -> Result<bool> {
        self.succeeds(&["image", "inspect", "--format={{.Id}}", image])
    }

    fn start(&self, spec: &RunSpec) -> Result<Box<dyn ContainerProcess>> {
        let args = spec.to_args();
        tracing::debug!(command = %args.join(" "), "docker");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CrpError::Launch {
                image: spec.image.clone(),
                source,
            })?;
        Ok(Box::new(DockerProcess { child }))
    }

    fn is_registered(&self, name: &str) -> Result<bool> {
        let inspected = self.output(&["container", "inspect", "--format={{.State.Status}}", name])?;
        Ok(inspected.status.success() && is_running(&inspected.stdout))
    }

    fn remove_labeled(&self, label: &str) -> Result<usize> {
        let filter = format!("--filter=label={label}");
        let listed = self.output(&["ps", "-aq", &filter])?;
        if !listed.status.success() {
            return Err(CrpError::Engine {
                command: "docker ps".into(),
                message: String::from_utf8_lossy(&listed.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&listed.stdout);
        let ids: Vec<&str> = stdout.split_whitespace().collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let mut args = vec!["rm", "-fv"];
        args.extend(&ids);
        let removed = self.output(&args)?;
        if !removed.status.success() {
            return Err(CrpError::Engine {
                command: "docker rm".into(),
                message: String::from_utf8_lossy(&removed.stderr).trim().to_owned(),
            });
        }
        Ok(ids.len())
    }

    fn is_available(&self) -> bool {
        self.succeeds(&["version", "--format={{.Server.Version}}"])
            .unwrap_or(false)
    }
}

/// An attached `docker run` client process.
#[derive(Debug)]
pub struct DockerProcess {
    child: Child,
}

impl ContainerProcess for DockerProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<ProcessExit>> {
        let status = self.child.try_wait().map_err(|source| CrpError::Io {
            path: PathBuf::from(format!("/proc/{}", self.child.id())),
            source,
        })?;
        Ok(status.map(|s| ProcessExit { code: s.code() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_unavailable() {
        let backend = DockerBackend::with_binary("/nonexistent/docker-client");
        assert!(!backend.is_available());
        assert!(backend.image_exists("any").is_err());
    }

    #[test]
    fn only_running_status_counts_as_registered() {
        assert!(is_running(b"running\n"));
        assert!(!is_running(b"created\n"));
        assert!(!is_running(b"exited"));
        assert!(!is_running(b""));
    }

    #[test]
    fn missing_binary_reports_launch_error_with_image() {
        use std::collections::BTreeMap;

        use crate::spec::NetworkMode;

        let backend = DockerBackend::with_binary("/nonexistent/docker-client");
        let spec = RunSpec {
            name: "c-solvable".into(),
            image: "reg/c:solvable".into(),
            env: Vec::new(),
            labels: Vec::new(),
            memory: "100M".into(),
            ulimits: Vec::new(),
            read_only: true,
            publish: Vec::new(),
            capabilities: None,
            sysctls: BTreeMap::new(),
            network: NetworkMode::isolated(),
            volumes: Vec::new(),
        };
        match backend.start(&spec) {
            Err(CrpError::Launch { image, .. }) => assert_eq!(image, "reg/c:solvable"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("start should fail without a client binary"),
        }
    }
}
