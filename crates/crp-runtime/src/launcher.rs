//! Launching a single composed container.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crp_common::config::LaunchSettings;
use crp_common::constants;
use crp_common::error::{CrpError, Result};
use crp_compose::ComposedContainer;
use crp_core::capability::CapabilityPolicy;
use crp_image::image_basename;

use crate::backend::{ContainerBackend, ContainerProcess};
use crate::hints::connection_hint;
use crate::spec::{NetworkMode, PortPublish, RunSpec};

const REGISTRATION_POLL: Duration = Duration::from_millis(100);

/// A started container and the process supervising it.
pub struct LaunchRecord {
    /// Short name within the group.
    pub short_name: String,
    /// Engine-level container name.
    pub name: String,
    /// Image the container runs.
    pub image: String,
    /// Connection instructions for every published port.
    pub hints: Vec<String>,
    /// Attached engine process.
    pub process: Box<dyn ContainerProcess>,
    /// When the engine process was started.
    pub started_at: DateTime<Utc>,
}

/// Engine-level name of a container: image basename plus short name.
#[must_use]
pub fn container_name(image: &str, short_name: &str) -> String {
    format!("{}-{short_name}", image_basename(image))
}

/// Identifying environment of a local run. Challenge and user ids are
/// placeholders.
fn identity_env(short_name: &str) -> Vec<(String, String)> {
    let nil = uuid::Uuid::nil().to_string();
    vec![
        ("AVATAO_CHALLENGE_ID".into(), nil.clone()),
        ("AVATAO_USER_ID".into(), nil),
        ("AVATAO_SHORT_NAME".into(), short_name.to_owned()),
        ("AVATAO_SECRET".into(), constants::SECRET.to_owned()),
        ("SECRET".into(), constants::SECRET.to_owned()),
    ]
}

/// Builds the run specification and connection hints for `container`.
///
/// `share_with` names the already running container whose network
/// namespace and volumes this one joins; `None` marks the namespace owner.
///
/// # Errors
///
/// Returns [`CrpError::CapabilityDenied`] if the policy rejects a
/// requested capability.
pub fn build_run_spec(
    container: &ComposedContainer,
    share_with: Option<&str>,
    policy: &CapabilityPolicy,
    settings: &LaunchSettings,
) -> Result<(RunSpec, Vec<String>)> {
    let name = container_name(&container.image, &container.short_name);

    let mut publish = Vec::new();
    let mut hints = Vec::new();
    for binding in container.ports.iter().flatten() {
        if settings.forward_ports {
            publish.push(PortPublish {
                bind_addr: constants::BIND_ADDR.to_owned(),
                port: binding.port,
                transport: binding.transport,
            });
        }
        hints.push(connection_hint(binding));
    }

    let capabilities = container
        .capabilities
        .as_deref()
        .map(|requested| policy.apply(requested))
        .transpose()?
        .map(|granted| granted.into_iter().collect());

    let network = share_with.map_or_else(NetworkMode::isolated, |target| {
        NetworkMode::SharedWith(target.to_owned())
    });

    let spec = RunSpec {
        name,
        image: container.image.clone(),
        env: identity_env(&container.short_name),
        labels: vec![constants::MANAGEMENT_LABEL.to_owned()],
        memory: container
            .memory_limit
            .clone()
            .unwrap_or_else(|| constants::MEMORY_LIMIT.to_owned()),
        ulimits: vec![
            format!("nproc={}", constants::ULIMIT_NPROC),
            format!("nofile={}", constants::ULIMIT_NOFILE),
        ],
        read_only: true,
        publish,
        capabilities,
        sysctls: container.kernel_params.clone(),
        network,
        volumes: container.volumes.clone(),
    };
    Ok((spec, hints))
}

/// Starts composed containers one at a time on a backend.
pub struct Launcher<'a> {
    backend: &'a dyn ContainerBackend,
    policy: &'a CapabilityPolicy,
    settings: &'a LaunchSettings,
}

impl<'a> Launcher<'a> {
    /// Creates a launcher.
    #[must_use]
    pub const fn new(
        backend: &'a dyn ContainerBackend,
        policy: &'a CapabilityPolicy,
        settings: &'a LaunchSettings,
    ) -> Self {
        Self {
            backend,
            policy,
            settings,
        }
    }

    /// Starts `container` and waits until the engine has registered it,
    /// so that later containers can join its namespace.
    ///
    /// # Errors
    ///
    /// Returns [`CrpError::ImageNotFound`] if the image is missing,
    /// [`CrpError::Launch`] if the engine cannot be invoked, and
    /// [`CrpError::Engine`] if the engine process exits before the
    /// container is registered.
    pub fn launch(
        &self,
        container: &ComposedContainer,
        share_with: Option<&str>,
    ) -> Result<LaunchRecord> {
        let (spec, hints) = build_run_spec(container, share_with, self.policy, self.settings)?;

        if !self.backend.image_exists(&spec.image)? {
            tracing::error!(image = %spec.image, "image not found, make sure that it was built");
            return Err(CrpError::ImageNotFound { image: spec.image });
        }

        let started_at = Utc::now();
        let mut process = self.backend.start(&spec)?;
        tracing::info!(
            name = %spec.name,
            image = %spec.image,
            pid = process.id(),
            shared_with = share_with.unwrap_or("-"),
            "container started"
        );

        self.await_registration(&spec.name, process.as_mut())?;

        Ok(LaunchRecord {
            short_name: container.short_name.clone(),
            name: spec.name,
            image: spec.image,
            hints,
            process,
            started_at,
        })
    }

    fn await_registration(&self, name: &str, process: &mut dyn ContainerProcess) -> Result<()> {
        let deadline = Instant::now() + self.settings.settle;
        loop {
            // `docker run` creates the container before starting it, so a
            // failed start still leaves it inspectable. Check the process first.
            if let Some(exit) = process.try_wait()? {
                if exit.success() {
                    tracing::debug!(name, "container finished during startup");
                    return Ok(());
                }
                return Err(CrpError::Engine {
                    command: format!("run {name}"),
                    message: format!("engine process ended with {exit} before the container was running"),
                });
            }
            if self.backend.is_registered(name)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::warn!(name, "container not running within the settle time, continuing");
                return Ok(());
            }
            thread::sleep(REGISTRATION_POLL);
        }
    }
}
