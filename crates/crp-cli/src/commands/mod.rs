//! CLI command definitions and dispatch.

pub mod cleanup;
pub mod plan;
pub mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crp_common::config::LaunchSettings;
use crp_common::constants;
use crp_compose::{ComposeContext, ComposedGroup};
use crp_core::capability::{CapabilityPolicy, NarrowingMode};
use crp_image::Registry;

use crate::loader;

/// crp — launch a challenge's container group locally.
#[derive(Parser, Debug)]
#[command(name = "crp", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the container group and wait until interrupted.
    Run(run::RunArgs),
    /// Show launch order and engine arguments without starting anything.
    Plan(plan::PlanArgs),
    /// Remove every container started by this tool.
    Cleanup(cleanup::CleanupArgs),
}

/// Arguments locating a challenge repository and its images.
#[derive(Args, Debug)]
pub struct ChallengeArgs {
    /// Path to the challenge repository (parent of config.yml).
    #[arg(default_value = ".")]
    pub repo_path: PathBuf,

    /// Repository name used in image references. Defaults to the
    /// repository directory name.
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Branch the images were built from.
    #[arg(long, default_value = constants::DEFAULT_BRANCH)]
    pub branch: String,

    /// Registry base URL.
    #[arg(long, env = "DOCKER_REGISTRY", default_value = constants::DEFAULT_REGISTRY)]
    pub registry: String,

    /// Fail on capabilities outside the allow-list instead of dropping them.
    #[arg(long)]
    pub strict_capabilities: bool,
}

impl ChallengeArgs {
    /// Loads `config.yml` and composes its container group.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded, declares no
    /// container group, or fails to compose.
    pub fn compose(&self) -> anyhow::Result<ComposedGroup> {
        let config = loader::load(&self.repo_path)?;
        let group = loader::container_group(config)?;
        let repo_name = match &self.repo_name {
            Some(name) => name.clone(),
            None => loader::repo_name(&self.repo_path)?,
        };

        let registry = Registry::new(&self.registry);
        let ctx = ComposeContext {
            registry: &registry,
            repo_name: &repo_name,
            branch: &self.branch,
        };
        crp_compose::compose(group, &ctx).context("failed to compose the container group")
    }

    /// Launch settings selected by the flags, defaults elsewhere.
    #[must_use]
    pub fn settings(&self) -> LaunchSettings {
        LaunchSettings {
            strict_capabilities: self.strict_capabilities,
            ..LaunchSettings::default()
        }
    }
}

/// Default capability allow-list with the narrowing mode of `settings`.
#[must_use]
pub fn policy(settings: &LaunchSettings) -> CapabilityPolicy {
    CapabilityPolicy::default().with_mode(NarrowingMode::from(settings))
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Plan(args) => plan::execute(args),
        Command::Cleanup(args) => cleanup::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["crp", "run"]).expect("parse");
        let Command::Run(args) = cli.command else {
            unreachable!("expected run");
        };
        assert_eq!(args.challenge.repo_path, PathBuf::from("."));
        assert_eq!(args.challenge.branch, "master");
        assert!(!args.challenge.strict_capabilities);
        assert!(args.forward_ports);
    }

    #[test]
    fn strict_flag_selects_reject_mode() {
        let cli = Cli::try_parse_from(["crp", "plan", "--strict-capabilities", "chal"])
            .expect("parse");
        let Command::Plan(args) = cli.command else {
            unreachable!("expected plan");
        };
        assert_eq!(policy(&args.challenge.settings()).mode(), NarrowingMode::Reject);
        assert_eq!(args.challenge.repo_path, PathBuf::from("chal"));
    }

    #[test]
    fn forward_ports_accepts_boolish_values() {
        let cli = Cli::try_parse_from(["crp", "run", "--forward-ports", "no"]).expect("parse");
        let Command::Run(args) = cli.command else {
            unreachable!("expected run");
        };
        assert!(!args.forward_ports);
    }

    #[test]
    fn forward_ports_value_is_not_taken_as_repo_path() {
        let cli = Cli::try_parse_from(["crp", "run", "--forward-ports", "false", "chal"])
            .expect("parse");
        let Command::Run(args) = cli.command else {
            unreachable!("expected run");
        };
        assert!(!args.forward_ports);
        assert_eq!(args.challenge.repo_path, PathBuf::from("chal"));
    }

    #[test]
    fn compose_reads_repository_config() {
        let parent = tempfile::tempdir().expect("tempdir");
        let repo = parent.path().join("mychal");
        std::fs::create_dir(&repo).expect("mkdir");
        std::fs::write(
            repo.join(constants::CONFIG_FILE),
            "crp_config:\n  controller:\n    ports: [5000/http]\n  solvable:\n    ports: [22/ssh]\n",
        )
        .expect("write");

        let args = ChallengeArgs {
            repo_path: repo,
            repo_name: None,
            branch: "staging".into(),
            registry: "reg.test/".into(),
            strict_capabilities: false,
        };
        let composed = args.compose().expect("compose");
        let images: Vec<&str> = composed.iter().map(|c| c.image.as_str()).collect();
        assert_eq!(
            images,
            vec!["reg.test/mychal:solvable-staging", "reg.test/mychal:controller-staging"]
        );
    }
}
