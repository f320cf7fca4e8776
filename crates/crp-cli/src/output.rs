//! Formatted operator-facing output for CLI commands.

use crp_runtime::launcher::LaunchRecord;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

/// Prints the tool banner.
pub fn print_header() {
    eprintln!();
    eprintln!(
        "  {BOLD}{}{RESET} {DIM}v{}{RESET}",
        crp_common::constants::APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
}

/// Prints the started containers and how to reach their ports.
pub fn print_launch_summary(records: &[LaunchRecord]) {
    eprintln!();
    eprintln!("  {GREEN}{BOLD}Started {}{RESET} container(s):", records.len());
    eprintln!();
    for record in records {
        eprintln!(
            "    {GREEN}●{RESET} {BOLD}{}{RESET} {DIM}[{}] {}{RESET}",
            record.name,
            record.image,
            record.started_at.format("%H:%M:%S")
        );
    }

    let hints: Vec<&str> = records
        .iter()
        .flat_map(|r| r.hints.iter().map(String::as_str))
        .collect();
    if !hints.is_empty() {
        eprintln!();
        for hint in hints {
            eprintln!("  {CYAN}Connection:{RESET} {BOLD}{hint}{RESET}");
        }
    }
}

/// Formats a `short name (image)` line for plans.
#[must_use]
pub fn describe(short_name: &str, image: &str) -> String {
    format!("{short_name} {DIM}({image}){RESET}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_mentions_name_and_image() {
        let line = describe("solvable", "reg/chal:solvable");
        assert!(line.starts_with("solvable "));
        assert!(line.contains("(reg/chal:solvable)"));
    }
}
