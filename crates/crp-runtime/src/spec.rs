//! Engine-level run specification of a single container.

use std::collections::BTreeMap;

use crp_common::constants;
use crp_common::types::Transport;
use crp_core::capability::Capability;
use serde::Serialize;

/// A port published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortPublish {
    /// Host address the port is bound to.
    pub bind_addr: String,
    /// Port number, identical on host and container side.
    pub port: u16,
    /// Transport protocol.
    pub transport: Transport,
}

/// How a container's network namespace is set up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// A fresh namespace with the given hostname and DNS server.
    Isolated {
        /// Hostname inside the container.
        hostname: String,
        /// DNS server address.
        dns: String,
    },
    /// Join the namespace of an already running container and mount all
    /// of its volumes.
    SharedWith(String),
}

/// Everything needed to start one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSpec {
    /// Engine-level container name.
    pub name: String,
    /// Absolute image reference.
    pub image: String,
    /// Environment variables, in order.
    pub env: Vec<(String, String)>,
    /// Labels (`key=value`).
    pub labels: Vec<String>,
    /// Memory limit string.
    pub memory: String,
    /// Ulimits as `name=soft:hard`.
    pub ulimits: Vec<String>,
    /// Mount the root filesystem read-only.
    pub read_only: bool,
    /// Published ports.
    pub publish: Vec<PortPublish>,
    /// Capabilities granted on top of an empty set. `None` keeps the
    /// engine defaults.
    pub capabilities: Option<Vec<Capability>>,
    /// Sysctl overrides.
    pub sysctls: BTreeMap<String, String>,
    /// Network namespace setup.
    pub network: NetworkMode,
    /// Anonymous volumes mounted at these paths.
    pub volumes: Vec<String>,
}

impl RunSpec {
    /// Renders the spec as a `docker run` argument list (without the
    /// `docker` binary itself).
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_owned()];

        for (key, value) in &self.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(format!("--name={}", self.name));
        args.extend(self.labels.iter().map(|l| format!("--label={l}")));
        args.push(format!("--memory={}", self.memory));
        args.extend(self.ulimits.iter().map(|u| format!("--ulimit={u}")));
        if self.read_only {
            args.push("--read-only".into());
        }

        for p in &self.publish {
            args.push("-p".into());
            args.push(format!("{}:{}:{}/{}", p.bind_addr, p.port, p.port, p.transport));
        }

        if let Some(caps) = &self.capabilities {
            args.push("--cap-drop=ALL".into());
            args.extend(caps.iter().map(|c| format!("--cap-add={c}")));
        }

        args.extend(self.sysctls.iter().map(|(k, v)| format!("--sysctl={k}={v}")));

        match &self.network {
            NetworkMode::Isolated { hostname, dns } => {
                args.push(format!("--dns={dns}"));
                args.push(format!("--hostname={hostname}"));
            }
            NetworkMode::SharedWith(target) => {
                args.push(format!("--network=container:{target}"));
                args.push(format!("--volumes-from={target}"));
            }
        }

        args.extend(self.volumes.iter().map(|v| format!("--volume={v}")));
        args.push(self.image.clone());
        args
    }
}

impl NetworkMode {
    /// The isolated setup of a namespace-owning container: fixed hostname
    /// and no DNS resolution.
    #[must_use]
    pub fn isolated() -> Self {
        Self::Isolated {
            hostname: constants::HOSTNAME.to_owned(),
            dns: constants::DISABLED_DNS.to_owned(),
        }
    }
}
