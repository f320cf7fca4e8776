//! `crp cleanup` — Remove every container this tool started.

use clap::Args;
use crp_runtime::{backend, group};

/// Arguments for the `cleanup` command.
#[derive(Args, Debug)]
pub struct CleanupArgs {}

/// Executes the `cleanup` command.
///
/// Safe to run repeatedly; finding nothing to remove is not an error.
///
/// # Errors
///
/// Returns an error if no container engine can be found.
pub fn execute(_args: CleanupArgs) -> anyhow::Result<()> {
    let backend = backend::detect_backend()?;
    let removed = group::teardown(backend.as_ref());
    eprintln!("Removed {removed} container(s).");
    Ok(())
}
