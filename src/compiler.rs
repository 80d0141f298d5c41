//! Compiles a build plan into a phar.
//!
//! Every compile is a clean rebuild: inputs are checked, any previous
//! artifact is removed, passes run in declared order inside one buffered
//! write, and the trailing file is appended once that write is committed.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::archive::{ArchiveEntry, PharArchive, SignatureAlgorithm};
use crate::preflight;
use crate::select::{CandidateFile, Pass};
use crate::strip;
use crate::stub::{self, StubConfig};

/// Base name that gets wrapped in newlines when added verbatim.
pub const LICENSE_NAME: &str = "LICENSE";

/// Everything a compile needs besides the output path.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Entry paths are computed relative to this directory.
    pub project_root: PathBuf,
    pub passes: Vec<Pass>,
    pub stub: StubConfig,
    /// Appended verbatim after the buffered write is committed.
    pub trailing_file: Option<PathBuf>,
    pub algorithm: SignatureAlgorithm,
}

/// Per-pass entry counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub name: String,
    pub files: usize,
    pub stripped: bool,
}

#[derive(Debug, Clone)]
pub struct CompileReport {
    pub output: PathBuf,
    pub passes: Vec<PassSummary>,
    pub entries: usize,
    /// Size of the committed artifact, including the trailing file.
    pub size: u64,
}

pub struct Compiler {
    plan: BuildPlan,
}

impl Compiler {
    pub fn new(plan: BuildPlan) -> Self {
        Self { plan }
    }

    /// Build the phar at `output`, replacing whatever is there.
    pub fn compile(&self, output: &Path) -> Result<CompileReport> {
        let report = preflight::check(&self.plan, output);
        if !report.all_passed() {
            let reasons: Vec<String> = report
                .failures()
                .map(|c| format!("{}: {}", c.name, c.details.as_deref().unwrap_or("failed")))
                .collect();
            bail!("Preflight failed:\n  {}", reasons.join("\n  "));
        }

        let root = fs::canonicalize(&self.plan.project_root).with_context(|| {
            format!(
                "Failed to resolve project root {}",
                self.plan.project_root.display()
            )
        })?;

        if output.exists() {
            tracing::info!("Removing existing {}", output.display());
            fs::remove_file(output)
                .with_context(|| format!("Failed to remove {}", output.display()))?;
        }

        let mut phar = PharArchive::create(output, &self.plan.stub.alias);
        phar.set_signature_algorithm(self.plan.algorithm);
        phar.start_buffering()?;

        let mut passes = Vec::with_capacity(self.plan.passes.len());
        for pass in &self.plan.passes {
            let mut files = 0;
            for candidate in pass
                .candidates()
                .with_context(|| format!("Failed to select files for {}", pass.name))?
            {
                let candidate = candidate?;
                let entry = build_entry(&root, &candidate)?;
                tracing::debug!("  + {} ({} bytes)", entry.path, entry.size());
                phar.add_entry(entry)
                    .with_context(|| format!("Failed to add {}", candidate.absolute_path.display()))?;
                files += 1;
            }
            tracing::info!("{}: {} files", pass.name, files);
            passes.push(PassSummary {
                name: pass.name.clone(),
                files,
                stripped: pass.strip,
            });
        }

        phar.set_stub(&stub::generate(&self.plan.stub))?;
        let mut size = phar
            .stop_buffering()
            .with_context(|| format!("Failed to write {}", output.display()))?;

        // A second commit: an interruption before it completes leaves the
        // archive above on disk without the trailing file.
        if let Some(trailing) = &self.plan.trailing_file {
            let candidate = CandidateFile {
                absolute_path: trailing.clone(),
                root_path: root.clone(),
                relative_path: PathBuf::from(trailing.file_name().unwrap_or_default()),
                strip: false,
            };
            let entry = build_entry(&root, &candidate)?;
            tracing::info!("Appending {}", entry.path);
            size = phar
                .append_entry(entry)
                .with_context(|| format!("Failed to append {}", trailing.display()))?;
        }

        let entries = phar.close().len();
        Ok(CompileReport {
            output: output.to_path_buf(),
            passes,
            entries,
            size,
        })
    }
}

/// Archive path of `file`: `root` stripped, `/`-separated.
pub fn entry_path(root: &Path, file: &Path) -> Result<String> {
    let real = fs::canonicalize(file)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;
    let rel = real.strip_prefix(root).with_context(|| {
        format!(
            "{} is outside the project root {}",
            real.display(),
            root.display()
        )
    })?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .with_context(|| format!("Non UTF-8 path: {}", rel.display()))?
                    .to_string(),
            ),
            _ => bail!("Unexpected path component in {}", rel.display()),
        }
    }
    Ok(parts.join("/"))
}

/// Bytes stored for a file: stripped when the pass asks for it, otherwise
/// verbatim, with license files wrapped in newlines.
pub fn prepare_content(path: &Path, raw: Vec<u8>, strip: bool) -> Vec<u8> {
    if strip {
        return match String::from_utf8(raw) {
            Ok(text) => strip::strip_whitespace(&text).into_bytes(),
            Err(e) => {
                tracing::warn!("not stripping non UTF-8 file {}", path.display());
                e.into_bytes()
            }
        };
    }
    if path.file_name().is_some_and(|n| n == LICENSE_NAME) {
        let mut wrapped = Vec::with_capacity(raw.len() + 2);
        wrapped.push(b'\n');
        wrapped.extend_from_slice(&raw);
        wrapped.push(b'\n');
        return wrapped;
    }
    raw
}

fn mtime_of(path: &Path) -> u32 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn build_entry(root: &Path, candidate: &CandidateFile) -> Result<ArchiveEntry> {
    let path = entry_path(root, &candidate.absolute_path)?;
    let raw = fs::read(&candidate.absolute_path)
        .with_context(|| format!("Failed to read {}", candidate.absolute_path.display()))?;
    let content = prepare_content(&candidate.absolute_path, raw, candidate.strip);
    Ok(ArchiveEntry::new(
        path,
        content,
        mtime_of(&candidate.absolute_path),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entry_path_strips_root_and_uses_slashes() {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("vendor/pear")).unwrap();
        fs::write(root.join("vendor/pear/PEAR.php"), "<?php").unwrap();
        assert_eq!(
            entry_path(&root, &root.join("vendor/pear/PEAR.php")).unwrap(),
            "vendor/pear/PEAR.php"
        );
    }

    #[test]
    fn entry_path_outside_root_is_an_error() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(b.path().join("x.php"), "").unwrap();
        let root = fs::canonicalize(a.path()).unwrap();
        assert!(entry_path(&root, &b.path().join("x.php")).is_err());
    }

    #[test]
    fn read_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("lib/Dir.php")).unwrap();
        let candidate = CandidateFile {
            absolute_path: root.join("lib/Dir.php"),
            root_path: root.join("lib"),
            relative_path: PathBuf::from("Dir.php"),
            strip: true,
        };
        let err = build_entry(&root, &candidate).unwrap_err();
        assert!(format!("{:#}", err).starts_with("Failed to read"), "{err:#}");
    }

    #[test]
    fn license_is_wrapped_only_when_not_stripped() {
        let license = Path::new("/p/LICENSE");
        assert_eq!(prepare_content(license, b"MIT".to_vec(), false), b"\nMIT\n");
        assert_eq!(
            prepare_content(Path::new("/p/LICENSE.txt"), b"MIT".to_vec(), false),
            b"MIT"
        );
    }

    #[test]
    fn stripping_applies_to_text_and_skips_binary() {
        let php = Path::new("a.php");
        assert_eq!(
            prepare_content(php, b"<?php\n// c\n$a;".to_vec(), true),
            b"<?php\n\n$a;"
        );
        let binary = vec![0xff, 0xfe, b'/', b'*'];
        assert_eq!(prepare_content(php, binary.clone(), true), binary);
    }
}
