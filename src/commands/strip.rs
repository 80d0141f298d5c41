//! Strip command - prints a file the way it would be packaged.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use pharc::strip;

pub fn cmd_strip(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let stripped = strip::strip_whitespace(&source);
    tracing::debug!(
        "{}: {} -> {} bytes",
        file.display(),
        source.len(),
        stripped.len()
    );
    std::io::stdout().write_all(stripped.as_bytes())?;
    Ok(())
}
