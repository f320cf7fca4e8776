//! `crp plan` — Display the launch plan without starting anything.

use clap::Args;
use crp_runtime::launcher::{build_run_spec, container_name};
use crp_runtime::spec::RunSpec;
use serde::Serialize;

use super::ChallengeArgs;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Challenge repository and image coordinates.
    #[command(flatten)]
    pub challenge: ChallengeArgs,

    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlannedContainer {
    short_name: String,
    shares_with: Option<String>,
    hints: Vec<String>,
    command: Vec<String>,
    spec: RunSpec,
}

/// Executes the `plan` command.
///
/// Composes the container group, builds each run specification in launch
/// order, and prints it.
///
/// # Errors
///
/// Returns an error if composition fails or the capability policy rejects
/// a request.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let composed = args.challenge.compose()?;
    let settings = args.challenge.settings();
    let policy = super::policy(&settings);

    let primary = composed
        .primary()
        .map(|c| container_name(&c.image, &c.short_name));

    let mut planned = Vec::with_capacity(composed.len());
    for (index, container) in composed.iter().enumerate() {
        let shares_with = if index == 0 { None } else { primary.clone() };
        let (spec, hints) =
            build_run_spec(container, shares_with.as_deref(), &policy, &settings)?;
        let mut command = vec!["docker".to_owned()];
        command.extend(spec.to_args());
        planned.push(PlannedContainer {
            short_name: container.short_name.clone(),
            shares_with,
            hints,
            command,
            spec,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    println!("Launch plan for: {}", args.challenge.repo_path.display());
    println!();
    for (index, item) in planned.iter().enumerate() {
        println!("  {}. {}", index + 1, output::describe(&item.short_name, &item.spec.image));
        match &item.shares_with {
            Some(target) => println!("      shares namespace and volumes of: {target}"),
            None => println!("      owns the network namespace"),
        }
        for hint in &item.hints {
            println!("      connection: {hint}");
        }
        println!("      {}", item.command.join(" "));
    }
    println!();
    println!("  {} container(s) will be started.", planned.len());

    Ok(())
}
