//! Composition of a container group into launch order.
//!
//! The first container owns the network namespace and volumes every other
//! container joins, so it must start first and is the only one that
//! publishes ports. The primary workload (`solvable`) always takes that
//! position when present, followed by the `controller`; any remaining
//! containers keep their declared order.

use std::collections::BTreeMap;

use crp_common::config::{ContainerGroupConfig, ContainerSpec};
use crp_common::constants;
use crp_common::error::{CrpError, Result};
use crp_common::types::PortMap;
use crp_image::Registry;
use serde::Serialize;

use crate::ports;

/// Repository coordinates used to derive image references.
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    /// Registry images are resolved against.
    pub registry: &'a Registry,
    /// Challenge repository name.
    pub repo_name: &'a str,
    /// Branch the images were built from.
    pub branch: &'a str,
}

/// A container ready to be launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedContainer {
    /// Short name within the group.
    pub short_name: String,
    /// Absolute image reference.
    pub image: String,
    /// Merged port mapping of the whole group. Only the first container
    /// carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<PortMap>,
    /// Declared memory limit, if any.
    pub memory_limit: Option<String>,
    /// Requested capability names, before policy filtering.
    pub capabilities: Option<Vec<String>>,
    /// Kernel parameter overrides.
    pub kernel_params: BTreeMap<String, String>,
    /// Writable mount points.
    pub volumes: Vec<String>,
}

/// An ordered, port-annotated container group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComposedGroup {
    containers: Vec<ComposedContainer>,
}

impl ComposedGroup {
    /// The namespace-owning container.
    #[must_use]
    pub fn primary(&self) -> Option<&ComposedContainer> {
        self.containers.first()
    }

    /// Containers in launch order.
    pub fn iter(&self) -> std::slice::Iter<'_, ComposedContainer> {
        self.containers.iter()
    }

    /// Number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns `true` if the group has no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl<'a> IntoIterator for &'a ComposedGroup {
    type Item = &'a ComposedContainer;
    type IntoIter = std::slice::Iter<'a, ComposedContainer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Orders a group for launch: `solvable`, then `controller`, then the
/// rest in declaration order.
pub fn order(mut config: ContainerGroupConfig) -> Vec<(String, ContainerSpec)> {
    let mut ordered = Vec::with_capacity(config.len());
    for name in [constants::SOLVABLE, constants::CONTROLLER] {
        if let Some(spec) = config.remove(name) {
            ordered.push((name.to_owned(), spec));
        }
    }
    ordered.extend(config);
    ordered
}

/// Orders the group, resolves every image, and moves the merged port
/// mapping onto the first container.
///
/// Nothing is returned unless every container composes cleanly.
///
/// # Errors
///
/// Returns [`CrpError::Config`] for an empty group and
/// [`CrpError::InvalidPort`] for any unparseable port declaration.
pub fn compose(config: ContainerGroupConfig, ctx: &ComposeContext<'_>) -> Result<ComposedGroup> {
    if config.is_empty() {
        return Err(CrpError::config("crp_config declares no containers"));
    }

    let mut merged = PortMap::new();
    let mut containers = Vec::with_capacity(config.len());

    for (short_name, spec) in order(config) {
        let image = spec.image.as_deref().map_or_else(
            || ctx.registry.resolve(ctx.repo_name, ctx.branch, &short_name, true),
            |explicit| ctx.registry.resolve_explicit(explicit),
        );

        merged.merge(ports::normalize(&spec.ports)?);

        containers.push(ComposedContainer {
            memory_limit: spec.memory_limit(),
            short_name,
            image,
            ports: None,
            capabilities: spec.capabilities,
            kernel_params: spec.kernel_params,
            volumes: spec.volumes,
        });
    }

    if let Some(first) = containers.first_mut() {
        first.ports = Some(merged);
    }

    let names: Vec<&str> = containers.iter().map(|c| c.short_name.as_str()).collect();
    tracing::info!(order = ?names, "container group composed");

    Ok(ComposedGroup { containers })
}
