//! Preflight command - runs preflight checks.

use anyhow::Result;

use pharc::config::Config;
use pharc::{layout, preflight};

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, strict: bool) -> Result<()> {
    let plan = layout::phing_plan(&config.project_root, config.signature);
    let report = preflight::check(&plan, &config.output);
    report.print();
    if !report.all_passed() {
        if strict {
            anyhow::bail!("Preflight failed: {} check(s) failed", report.fail_count());
        }
        println!("Some checks failed. Use --strict to fail with an error.");
    }
    Ok(())
}
