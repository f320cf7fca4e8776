//! Loading a challenge repository's `config.yml`.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use crp_common::config::{ChallengeConfig, ContainerGroupConfig};
use crp_common::constants::CONFIG_FILE;

/// Reads and parses `config.yml` from `repo_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match the
/// typed configuration model.
pub fn load(repo_path: &Path) -> Result<ChallengeConfig> {
    let path = repo_path.join(CONFIG_FILE);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Extracts the container group from a challenge configuration.
///
/// # Errors
///
/// Returns an error if the configuration declares no `crp_config`.
pub fn container_group(config: ChallengeConfig) -> Result<ContainerGroupConfig> {
    config
        .crp_config
        .ok_or_else(|| anyhow!("there is no crp_config in {CONFIG_FILE}"))
}

/// Repository name derived from the directory name of `repo_path`.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or has no final
/// component.
pub fn repo_name(repo_path: &Path) -> Result<String> {
    let resolved = repo_path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", repo_path.display()))?;
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("cannot derive a repository name from {}", resolved.display()))
}
