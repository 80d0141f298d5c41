//! Preflight checks run before a compile touches its output.
//!
//! Every configured root and file must be readable and the output directory
//! must exist. A failing check aborts the compile while a stale artifact at
//! the output path is still intact.

use std::fs::File;
use std::path::Path;

use crate::compiler::BuildPlan;
use crate::select::{self, PassSource};

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Check failed - the compile will not start.
    Fail,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let (icon, status_str) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
            };
            print!("  {} [{}] {}", icon, status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        println!(
            "{} checks, {} failed",
            self.checks.len(),
            self.fail_count()
        );
    }
}

fn check_file(name: &str, path: &Path) -> CheckResult {
    if !path.is_file() {
        return CheckResult::fail(name, &format!("missing file {}", path.display()));
    }
    match File::open(path) {
        Ok(_) => CheckResult::pass_with(name, &path.display().to_string()),
        Err(e) => CheckResult::fail(name, &format!("{}: {}", path.display(), e)),
    }
}

/// Check every input of `plan` and the output location.
pub fn check(plan: &BuildPlan, output: &Path) -> PreflightReport {
    let mut checks = Vec::new();

    if plan.project_root.is_dir() {
        checks.push(CheckResult::pass_with(
            "project root",
            &plan.project_root.display().to_string(),
        ));
    } else {
        checks.push(CheckResult::fail(
            "project root",
            &format!("not a directory: {}", plan.project_root.display()),
        ));
    }

    for pass in &plan.passes {
        match &pass.source {
            PassSource::Tree { roots, .. } => {
                for root in roots {
                    let name = format!("{} root", pass.name);
                    checks.push(match select::check_root(root) {
                        Ok(()) => CheckResult::pass_with(&name, &root.display().to_string()),
                        Err(e) => CheckResult::fail(&name, &format!("{:#}", e)),
                    });
                }
            }
            PassSource::File(path) => checks.push(check_file(&pass.name, path)),
        }
    }

    if let Some(trailing) = &plan.trailing_file {
        checks.push(check_file("trailing file", trailing));
    }

    let out_dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    checks.push(if !out_dir.is_dir() {
        CheckResult::fail(
            "output directory",
            &format!("does not exist: {}", out_dir.display()),
        )
    } else if output.is_dir() {
        CheckResult::fail(
            "output path",
            &format!("is a directory: {}", output.display()),
        )
    } else {
        CheckResult::pass("output path")
    });

    PreflightReport { checks }
}
