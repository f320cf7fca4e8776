//! System-wide constants shared by the composition and launch layers.

/// Registry used when `DOCKER_REGISTRY` is not set.
pub const DEFAULT_REGISTRY: &str = "eu.gcr.io/avatao-challengestore";

/// Branch whose images carry no tag suffix.
pub const DEFAULT_BRANCH: &str = "master";

/// Short name of the primary workload container.
pub const SOLVABLE: &str = "solvable";

/// Short name of the auxiliary controller container.
pub const CONTROLLER: &str = "controller";

/// Name of the challenge configuration file in a repository root.
pub const CONFIG_FILE: &str = "config.yml";

/// Address every published port is bound to.
pub const BIND_ADDR: &str = "127.0.0.1";

/// Process count ulimit (`soft:hard`).
pub const ULIMIT_NPROC: &str = "2048:4096";

/// Open file descriptor ulimit (`soft:hard`).
pub const ULIMIT_NOFILE: &str = "8192:16384";

/// Memory limit applied when a container does not declare one.
pub const MEMORY_LIMIT: &str = "100M";

/// Shared secret handed to every container of a local run.
pub const SECRET: &str = "secret";

/// Label attached to every launched container and used to find them
/// again during teardown.
pub const MANAGEMENT_LABEL: &str = "com.avatao.typed_crp_id=docker";

/// Hostname of the namespace-owning container.
pub const HOSTNAME: &str = "avatao";

/// DNS server given to the namespace-owning container. Resolution is
/// disabled since deployed challenges have no internet access.
pub const DISABLED_DNS: &str = "0.0.0.0";

/// Default time allowed for the engine to register a started container.
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Application protocols recognised in port declarations.
pub const KNOWN_PROTOCOLS: &[&str] = &["udp", "tcp", "ssh", "http", "ws", "controller"];

/// Application name used in CLI output.
pub const APP_NAME: &str = "crp";
