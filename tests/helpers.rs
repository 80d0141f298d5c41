//! Shared test utilities for pharc tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment with a temporary project directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Project root being packaged
    pub project: PathBuf,
    /// Directory for build outputs
    pub out_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let project = base.join("project");
        let out_dir = base.join("out");
        fs::create_dir_all(&project).expect("Failed to create project dir");
        fs::create_dir_all(&out_dir).expect("Failed to create output dir");

        Self {
            _temp_dir: temp_dir,
            project,
            out_dir,
        }
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.out_dir.join(name)
    }

    /// Write `content` to `rel` under the project, creating parents.
    pub fn write(&self, rel: &str, content: &str) {
        write_file(&self.project, rel, content);
    }
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, content).expect("Failed to write file");
}

/// Block comment spanning three lines, then two statements.
pub const COMMENTED_LIB: &str = "<?php\n/*\n * Library\n */\nfoo();\nbar();\n";

/// A minimal Phing checkout with everything the default layout expects.
pub fn create_mock_phing_project(root: &Path) {
    let files: &[(&str, &str)] = &[
        ("src/Compiler.php", "<?php\nclass Compiler {}\n"),
        (
            "src/Helper.php",
            "<?php\n// kept as-is\nclass Helper {}\n",
        ),
        ("src/README.md", "not packaged\n"),
        (
            "vendor/composer/ClassLoader.php",
            "<?php\nnamespace Composer\\Autoload;\n\n/** loader */\nclass ClassLoader {}\n",
        ),
        ("vendor/composer/installed.json", "[]\n"),
        ("vendor/pear/pear-core/PEAR.php", COMMENTED_LIB),
        ("vendor/pear/pear-core/Tests/PEARTest.php", "<?php\n"),
        (
            "vendor/autoload.php",
            "<?php\n\n// autoload.php @generated by Composer\n\nreturn require __DIR__ . '/composer/ClassLoader.php';\n",
        ),
        ("vendor/phing/phing/bin/phing.php", "<?php\n# entry\nMain::start($argv);\n"),
        (
            "vendor/phing/phing/classes/phing/Phing.php",
            "<?php\n/**\n * Phing\n */\nclass Phing {}\n",
        ),
        ("vendor/phing/phing/etc/phing-grammar.rng", "<grammar/>\n"),
        ("vendor/phing/phing/test/PhingTest.php", "<?php\n"),
        ("vendor/phing/phing/docs/guide.html", "<html/>\n"),
        ("vendor/phing/phing/build/build.xml", "<project/>\n"),
        ("vendor/phing/phing/.git/HEAD", "ref: refs/heads/main\n"),
        ("LICENSE", "Copyright (c) Phing contributors"),
    ];
    for (rel, content) in files {
        write_file(root, rel, content);
    }
}
