//! Build command - compiles the phar.

use anyhow::Result;
use std::path::Path;

use pharc::compiler::Compiler;
use pharc::config::Config;
use pharc::layout;
use pharc::timing::Timer;

/// Execute the build command.
pub fn cmd_build(config: &Config, output: Option<&Path>) -> Result<()> {
    let output = output.unwrap_or(&config.output);
    let plan = layout::phing_plan(&config.project_root, config.signature);

    tracing::info!(
        "Compiling {} into {}",
        config.project_root.display(),
        output.display()
    );
    let timer = Timer::start("compile");
    let report = Compiler::new(plan).compile(output)?;
    timer.finish();

    println!("=== Build Complete ===");
    for pass in &report.passes {
        let mode = if pass.stripped { "stripped" } else { "verbatim" };
        println!("  {:<16} {:>6} files ({})", pass.name, pass.files, mode);
    }
    println!(
        "  {} entries, {} bytes -> {}",
        report.entries,
        report.size,
        report.output.display()
    );
    Ok(())
}
