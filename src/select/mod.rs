//! File selection over source roots.
//!
//! A [`Pass`] names one batch of files that end up in the archive: either a
//! walk over one or more roots filtered by a [`SelectionRule`], or a single
//! explicit file. Each pass carries its own `strip` policy.

mod rule;

pub use rule::{SelectionRule, VCS_DIRS};

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use rule::CompiledRule;

/// A file chosen for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub absolute_path: PathBuf,
    /// The root the file was found under.
    pub root_path: PathBuf,
    /// Path relative to `root_path`.
    pub relative_path: PathBuf,
    pub strip: bool,
}

/// Lazily yields the files of one root that satisfy a rule, in a stable order.
pub struct Selection {
    root: PathBuf,
    strip: bool,
    rule: CompiledRule,
    walker: walkdir::IntoIter,
}

/// Select files under `root` matching `rule`.
///
/// Fails immediately when `root` is missing or not a readable directory.
pub fn select(root: &Path, rule: &SelectionRule, strip: bool) -> Result<Selection> {
    check_root(root)?;
    Ok(Selection {
        root: root.to_path_buf(),
        strip,
        rule: rule.compile()?,
        walker: WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
    })
}

/// Verify that `root` exists and can be listed.
pub fn check_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        bail!("Source root does not exist or is not a directory: {}", root.display());
    }
    fs::read_dir(root)
        .with_context(|| format!("Source root is not readable: {}", root.display()))?;
    Ok(())
}

/// Render a relative path with `/` separators.
pub fn to_slash(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl Iterator for Selection {
    type Item = Result<CandidateFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e)
                        .context(format!("Failed to walk {}", self.root.display()))))
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            if entry.file_type().is_dir() {
                if !self.rule.enter_dir(&name, &to_slash(&rel)) {
                    self.walker.skip_current_dir();
                }
                continue;
            }

            // Symlinks to regular files count as files; symlinked dirs are not walked.
            if !entry.path().is_file() || !self.rule.accept_file(&name) {
                continue;
            }

            return Some(Ok(CandidateFile {
                absolute_path: entry.path().to_path_buf(),
                root_path: self.root.clone(),
                relative_path: rel,
                strip: self.strip,
            }));
        }
    }
}

/// Where a pass takes its files from.
#[derive(Debug, Clone)]
pub enum PassSource {
    /// Walk each root in order with the same rule.
    Tree {
        roots: Vec<PathBuf>,
        rule: SelectionRule,
    },
    /// One explicit file.
    File(PathBuf),
}

/// One batch of archive content with a shared strip policy.
#[derive(Debug, Clone)]
pub struct Pass {
    pub name: String,
    pub source: PassSource,
    pub strip: bool,
}

impl Pass {
    pub fn tree(name: &str, roots: Vec<PathBuf>, rule: SelectionRule, strip: bool) -> Self {
        Self {
            name: name.to_string(),
            source: PassSource::Tree { roots, rule },
            strip,
        }
    }

    pub fn file(name: &str, path: impl Into<PathBuf>, strip: bool) -> Self {
        Self {
            name: name.to_string(),
            source: PassSource::File(path.into()),
            strip,
        }
    }

    /// Paths this pass needs to exist before a compile may touch its output.
    pub fn inputs(&self) -> Vec<&Path> {
        match &self.source {
            PassSource::Tree { roots, .. } => roots.iter().map(PathBuf::as_path).collect(),
            PassSource::File(path) => vec![path.as_path()],
        }
    }

    /// All candidates of this pass, roots in declared order.
    pub fn candidates(&self) -> Result<Box<dyn Iterator<Item = Result<CandidateFile>> + '_>> {
        match &self.source {
            PassSource::Tree { roots, rule } => {
                let mut selections = Vec::with_capacity(roots.len());
                for root in roots {
                    selections.push(select(root, rule, self.strip)?);
                }
                Ok(Box::new(selections.into_iter().flatten()))
            }
            PassSource::File(path) => {
                if !path.is_file() {
                    bail!("File does not exist: {}", path.display());
                }
                let root = path.parent().unwrap_or(Path::new("")).to_path_buf();
                let relative = PathBuf::from(path.file_name().unwrap_or_default());
                Ok(Box::new(std::iter::once(Ok(CandidateFile {
                    absolute_path: path.clone(),
                    root_path: root,
                    relative_path: relative,
                    strip: self.strip,
                }))))
            }
        }
    }
}
