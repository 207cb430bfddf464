//! `--test` self checks and the `--stats` summary.

use crate::{bot::BotCore, permission::Requirement};
use std::path::Path;

pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

/// Checks that need no connection to Discord.
pub fn run(core: &BotCore) -> Vec<Check> {
    let cfg = &core.cfg;
    let problems = cfg.problems();
    let report = &core.load_report;

    vec![
        Check::new(
            "configuration",
            problems.is_empty(),
            match problems.is_empty() {
                true => "no problems".to_owned(),
                false => problems.join("; "),
            },
        ),
        Check::new(
            "token",
            plausible_token(&cfg.general.discord_token),
            "three dot separated segments",
        ),
        Check::new(
            "owners",
            core.gate.owner_count() > 0,
            format!("{} configured", core.gate.owner_count()),
        ),
        Check::new(
            "commands",
            report.rejected.is_empty() && !core.registry.is_empty(),
            match report.rejected.is_empty() {
                true => format!(
                    "{} loaded, {} aliases dropped",
                    report.loaded,
                    report.dropped_aliases.len()
                ),
                false => report
                    .rejected
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            },
        ),
        match writable(&cfg.logging.directory) {
            Ok(()) => Check::new("log directory", true, cfg.logging.directory.to_string_lossy()),
            Err(e) => Check::new("log directory", false, e.to_string()),
        },
    ]
}

/// Print `checks` and return whether all of them passed.
pub fn report(checks: &[Check]) -> bool {
    for check in checks {
        let mark = if check.passed { "ok" } else { "FAILED" };
        println!("{:>6}  {}: {}", mark, check.name, check.detail);
    }
    checks.iter().all(|check| check.passed)
}

fn plausible_token(token: &str) -> bool {
    let segments: Vec<&str> = token.trim().split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

fn writable(directory: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(directory)?;
    let probe = directory.join(".write-test");
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(probe)
}

/// Registry summary grouped by category.
pub fn summary(core: &BotCore) -> String {
    let mut text = format!(
        "{} commands, {} listeners\n",
        core.registry.len(),
        core.events.len()
    );
    for category in core.registry.categories() {
        text.push_str(&format!("\n[{}]\n", category));
        for descriptor in core.registry.iter().filter(|d| d.category == category) {
            let mut flags = Vec::new();
            if descriptor.slash {
                flags.push("slash".to_owned());
            }
            if !descriptor.enabled {
                flags.push("disabled".to_owned());
            }
            if descriptor.requirement != Requirement::Anyone {
                flags.push(format!("{:?}", descriptor.requirement));
            }
            text.push_str(&format!("  {}", descriptor.name));
            if !descriptor.aliases.is_empty() {
                text.push_str(&format!(" ({})", descriptor.aliases.join(", ")));
            }
            if !flags.is_empty() {
                text.push_str(&format!(" [{}]", flags.join(", ")));
            }
            text.push('\n');
        }
    }
    text
}
