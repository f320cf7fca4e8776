//! Unified error types for the launcher workspace.
//!
//! Library crates return [`Result`] over [`CrpError`]; the binary wraps
//! these into `anyhow` errors with additional context.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CrpError {
    /// The container group configuration is structurally invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A raw port declaration could not be parsed.
    #[error("invalid port declaration {raw:?}: {reason}")]
    InvalidPort {
        /// The declaration as written in the configuration.
        raw: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Requested capabilities fall outside the allow-list.
    #[error("capabilities not permitted: {}", rejected.join(", "))]
    CapabilityDenied {
        /// Names of the rejected capabilities, as requested.
        rejected: Vec<String>,
    },

    /// The image to launch does not exist in the local engine.
    #[error("image {image} not found, make sure that it was built")]
    ImageNotFound {
        /// Absolute image reference.
        image: String,
    },

    /// The container engine could not be invoked.
    #[error("failed to run {image}: {source}")]
    Launch {
        /// Image that was being launched.
        image: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The container engine ran but reported a failure.
    #[error("container engine command `{command}` failed: {message}")]
    Engine {
        /// Short form of the engine command.
        command: String,
        /// Failure description (exit status, stderr).
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl CrpError {
    /// Shorthand for a [`CrpError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CrpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_denied_lists_every_name() {
        let err = CrpError::CapabilityDenied {
            rejected: vec!["SYS_ADMIN".into(), "SYS_BOOT".into()],
        };
        assert_eq!(
            err.to_string(),
            "capabilities not permitted: SYS_ADMIN, SYS_BOOT"
        );
    }

    #[test]
    fn image_not_found_names_the_image() {
        let err = CrpError::ImageNotFound {
            image: "registry/chal:solvable".into(),
        };
        assert!(err.to_string().contains("registry/chal:solvable"));
    }
}
