//! `crp run` — Launch the container group and supervise it.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use crp_common::config::LaunchSettings;
use crp_common::constants;
use crp_runtime::backend;
use crp_runtime::group::{CancelToken, ContainerGroup, POLL_INTERVAL, WaitOutcome};

use super::ChallengeArgs;
use crate::output::{self, BOLD, GREEN, RESET, YELLOW};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Challenge repository and image coordinates.
    #[command(flatten)]
    pub challenge: ChallengeArgs,

    /// Publish declared ports on the loopback address.
    #[arg(
        long,
        env = "TOOLBOX_FORWARD_PORTS",
        default_value = "true",
        action = ArgAction::Set,
        num_args = 1,
        value_parser = BoolishValueParser::new(),
    )]
    pub forward_ports: bool,

    /// Milliseconds to wait for the engine to register each container.
    #[arg(long, default_value_t = constants::DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if composition or any container launch fails. Every
/// container started so far is removed before the error is returned.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    output::print_header();

    let composed = args.challenge.compose()?;
    let settings = LaunchSettings {
        forward_ports: args.forward_ports,
        settle: Duration::from_millis(args.settle_ms),
        ..args.challenge.settings()
    };
    let policy = super::policy(&settings);

    let backend = backend::detect_backend()?;
    if !backend.is_available() {
        anyhow::bail!("the docker daemon is not reachable");
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let mut group = ContainerGroup::launch(backend.as_ref(), &composed, &policy, &settings)?;
    output::print_launch_summary(group.records());

    eprintln!();
    eprintln!("  Press {BOLD}Ctrl+C{RESET} to stop and remove all containers...");

    match group.wait(&cancel, POLL_INTERVAL)? {
        WaitOutcome::Interrupted => {
            eprintln!();
            eprintln!("  {YELLOW}Interrupted.{RESET} Removing containers...");
        }
        WaitOutcome::Completed(exits) => {
            tracing::info!(containers = exits.len(), "all containers exited");
        }
    }

    drop(group);
    eprintln!("  {GREEN}All containers removed.{RESET}");
    Ok(())
}
