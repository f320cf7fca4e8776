//! Container engine abstraction.
//!
//! The launcher never runs containers itself; it hands a [`RunSpec`] to a
//! [`ContainerBackend`] and supervises the returned process.

pub mod docker;

use std::fmt;

use crp_common::error::Result;

use crate::spec::RunSpec;

/// How a supervised engine process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("signal"),
        }
    }
}

/// A running engine process attached to one container.
pub trait ContainerProcess: Send {
    /// OS process id of the engine client.
    fn id(&self) -> u32;

    /// Checks, without blocking, whether the process has exited.
    ///
    /// # Errors
    ///
    /// Returns an error if the process status cannot be queried.
    fn try_wait(&mut self) -> Result<Option<ProcessExit>>;
}

/// A container engine that can run, inspect, and bulk-remove containers.
///
/// Implementors handle the engine-specific invocation details.
pub trait ContainerBackend: Send + Sync {
    /// Returns whether `image` exists locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    fn image_exists(&self, image: &str) -> Result<bool>;

    /// Starts a container and returns its supervised process.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked.
    fn start(&self, spec: &RunSpec) -> Result<Box<dyn ContainerProcess>>;

    /// Returns whether a container named `name` exists and is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    fn is_registered(&self, name: &str) -> Result<bool>;

    /// Forcibly removes every container carrying `label`, together with
    /// its volumes, returning how many were removed.
    ///
    /// Finding nothing to remove is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot list or remove containers.
    fn remove_labeled(&self, label: &str) -> Result<usize>;

    /// Returns whether the engine is reachable.
    fn is_available(&self) -> bool;
}

/// Locates the container engine on this host.
///
/// # Errors
///
/// Returns an error if no supported engine binary is on `PATH`.
pub fn detect_backend() -> Result<Box<dyn ContainerBackend>> {
    Ok(Box::new(docker::DockerBackend::locate()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_success() {
        assert!(ProcessExit { code: Some(0) }.success());
        assert!(!ProcessExit { code: Some(1) }.success());
        assert!(!ProcessExit { code: None }.success());
    }

    #[test]
    fn exit_display() {
        assert_eq!(ProcessExit { code: Some(137) }.to_string(), "exit code 137");
        assert_eq!(ProcessExit { code: None }.to_string(), "signal");
    }
}
