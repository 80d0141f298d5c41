//! The Phing project layout: which trees go into `phing.phar`, in what order,
//! and how the stub boots it.

use std::path::Path;

use crate::archive::SignatureAlgorithm;
use crate::compiler::BuildPlan;
use crate::select::{Pass, SelectionRule};
use crate::stub::StubConfig;

pub const DEFAULT_ALIAS: &str = "phing.phar";
pub const LICENSE_FILE: &str = "LICENSE";

/// Directory of the builder's own PHP sources, relative to the project root.
pub const OWN_SOURCE_DIR: &str = "src";
pub const VENDOR_DIR: &str = "vendor";
pub const RUNTIME_DIR: &str = "vendor/phing";

/// Directories never shipped from the runtime tree.
const RUNTIME_EXCLUDES: &[&str] = &["test", "docs", "build"];

pub fn phing_stub() -> StubConfig {
    StubConfig {
        alias: DEFAULT_ALIAS.to_string(),
        header: vec![
            "This file is part of PhingPharBuilder.".to_string(),
            String::new(),
            "For the full copyright and license information, please view".to_string(),
            "the license that is located at the bottom of this file.".to_string(),
        ],
        home_env: "PHING_HOME".to_string(),
        home_path: "vendor/phing/phing".to_string(),
        include_paths: vec!["vendor/phing/phing/classes".to_string()],
        logger_flag: "-logger".to_string(),
        logger_class: "phing.listener.AnsiColorLogger".to_string(),
        autoloader: "vendor/autoload.php".to_string(),
        entry_point: "vendor/phing/phing/bin/phing.php".to_string(),
    }
}

fn runtime_rule() -> SelectionRule {
    RUNTIME_EXCLUDES
        .iter()
        .fold(SelectionRule::new(), |rule, dir| rule.exclude(dir))
}

/// Passes for a Phing project rooted at `root`, in the order they are added.
pub fn phing_passes(root: &Path) -> Vec<Pass> {
    let vendor = root.join(VENDOR_DIR);
    vec![
        Pass::tree(
            "own source",
            vec![root.join(OWN_SOURCE_DIR)],
            SelectionRule::new().name("*.php").not_name("Compiler.php"),
            false,
        ),
        Pass::tree(
            "dependencies",
            vec![vendor.join("composer"), vendor.join("pear")],
            SelectionRule::new().name("*.php").exclude("Tests"),
            true,
        ),
        Pass::file("autoloader", vendor.join("autoload.php"), true),
        Pass::tree(
            "runtime code",
            vec![root.join(RUNTIME_DIR)],
            runtime_rule().name("*.php"),
            true,
        ),
        Pass::tree(
            "runtime assets",
            vec![root.join(RUNTIME_DIR)],
            runtime_rule().not_name("*.php"),
            false,
        ),
    ]
}

/// The complete build plan for `phing.phar`.
pub fn phing_plan(root: &Path, algorithm: SignatureAlgorithm) -> BuildPlan {
    BuildPlan {
        project_root: root.to_path_buf(),
        passes: phing_passes(root),
        stub: phing_stub(),
        trailing_file: Some(root.join(LICENSE_FILE)),
        algorithm,
    }
}
