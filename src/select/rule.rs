//! Include/exclude rules applied to a source root.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Directories holding version-control metadata. Never descended into.
pub const VCS_DIRS: &[&str] = &[
    ".svn",
    "_svn",
    "CVS",
    "_darcs",
    ".arch-params",
    ".monotone",
    ".bzr",
    ".git",
    ".hg",
];

/// Which files of a source root become archive entries.
///
/// A file qualifies when its name matches at least one include glob (or no
/// include globs are given), matches no exclude glob, and does not live under
/// an excluded subpath.
#[derive(Debug, Clone)]
pub struct SelectionRule {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    /// A bare directory name excludes that directory at any depth; a value
    /// containing `/` excludes exactly that path relative to the root.
    pub exclude_subpaths: Vec<String>,
    pub ignore_vcs: bool,
    pub ignore_dot_files: bool,
}

impl Default for SelectionRule {
    fn default() -> Self {
        Self {
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            exclude_subpaths: Vec::new(),
            ignore_vcs: true,
            ignore_dot_files: true,
        }
    }
}

impl SelectionRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only select files whose name matches `glob`.
    pub fn name(mut self, glob: &str) -> Self {
        self.include_globs.push(glob.to_string());
        self
    }

    /// Skip files whose name matches `glob`.
    pub fn not_name(mut self, glob: &str) -> Self {
        self.exclude_globs.push(glob.to_string());
        self
    }

    /// Skip everything under the directory `subpath`.
    pub fn exclude(mut self, subpath: &str) -> Self {
        self.exclude_subpaths
            .push(subpath.trim_matches('/').to_string());
        self
    }

    pub fn ignore_vcs(mut self, ignore: bool) -> Self {
        self.ignore_vcs = ignore;
        self
    }

    pub fn ignore_dot_files(mut self, ignore: bool) -> Self {
        self.ignore_dot_files = ignore;
        self
    }

    pub(crate) fn compile(&self) -> Result<CompiledRule> {
        let include = if self.include_globs.is_empty() {
            None
        } else {
            Some(compile_globset(&self.include_globs)?)
        };
        Ok(CompiledRule {
            include,
            exclude: compile_globset(&self.exclude_globs)?,
            exclude_names: self
                .exclude_subpaths
                .iter()
                .filter(|s| !s.contains('/'))
                .cloned()
                .collect(),
            exclude_paths: self
                .exclude_subpaths
                .iter()
                .filter(|s| s.contains('/'))
                .cloned()
                .collect(),
            ignore_vcs: self.ignore_vcs,
            ignore_dot_files: self.ignore_dot_files,
        })
    }
}

fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        builder.add(Glob::new(g).with_context(|| format!("invalid glob: {g:?}"))?);
    }
    builder.build().context("failed to build glob set")
}

/// A `SelectionRule` with its globs compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    include: Option<GlobSet>,
    exclude: GlobSet,
    exclude_names: Vec<String>,
    exclude_paths: Vec<String>,
    ignore_vcs: bool,
    ignore_dot_files: bool,
}

impl CompiledRule {
    /// Whether the walk should descend into a directory. `rel` uses `/`.
    pub(crate) fn enter_dir(&self, name: &str, rel: &str) -> bool {
        if self.ignore_vcs && VCS_DIRS.contains(&name) {
            return false;
        }
        if self.ignore_dot_files && name.starts_with('.') {
            return false;
        }
        !self.exclude_names.iter().any(|n| n == name)
            && !self.exclude_paths.iter().any(|p| p == rel)
    }

    /// Whether a regular file with this name is selected.
    pub(crate) fn accept_file(&self, name: &str) -> bool {
        if self.ignore_dot_files && name.starts_with('.') {
            return false;
        }
        let name = Path::new(name);
        let included = self.include.as_ref().map_or(true, |set| set.is_match(name));
        included && !self.exclude.is_match(name)
    }
}
