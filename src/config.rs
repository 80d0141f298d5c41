//! Configuration management for pharc.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::archive::SignatureAlgorithm;
use crate::layout::DEFAULT_ALIAS;

pub const ENV_ROOT: &str = "PHARC_ROOT";
pub const ENV_OUTPUT: &str = "PHARC_OUTPUT";
pub const ENV_SIGNATURE: &str = "PHARC_SIGNATURE";

/// pharc configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project being packaged (default: the base directory)
    pub project_root: PathBuf,
    /// Where the phar is written (default: `<project_root>/phing.phar`)
    pub output: PathBuf,
    pub signature: SignatureAlgorithm,
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

impl Config {
    /// Load configuration from `<base_dir>/.env` and the environment.
    ///
    /// A missing .env is fine; a malformed one or an unknown signature
    /// algorithm is an error.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            let iter = dotenvy::from_path_iter(&env_path)
                .with_context(|| format!("Failed to read {}", env_path.display()))?;
            for item in iter {
                let (key, value) =
                    item.with_context(|| format!("Malformed {}", env_path.display()))?;
                env_vars.insert(key, value);
            }
        }

        for key in [ENV_ROOT, ENV_OUTPUT, ENV_SIGNATURE] {
            if let Ok(value) = std::env::var(key) {
                env_vars.insert(key.to_string(), value);
            }
        }

        let project_root = env_vars
            .get(ENV_ROOT)
            .map(|s| resolve(base_dir, s))
            .unwrap_or_else(|| base_dir.to_path_buf());

        let output = env_vars
            .get(ENV_OUTPUT)
            .map(|s| resolve(base_dir, s))
            .unwrap_or_else(|| project_root.join(DEFAULT_ALIAS));

        let signature = match env_vars.get(ENV_SIGNATURE) {
            Some(s) => s
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid {}: {}", ENV_SIGNATURE, e))?,
            None => SignatureAlgorithm::default(),
        };

        Ok(Self {
            project_root,
            output,
            signature,
        })
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  {}: {}", ENV_ROOT, self.project_root.display());
        println!("  {}: {}", ENV_OUTPUT, self.output.display());
        println!("  {}: {}", ENV_SIGNATURE, self.signature.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn clear_env() {
        for key in [ENV_ROOT, ENV_OUTPUT, ENV_SIGNATURE] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_follow_the_base_directory() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.output, dir.path().join("phing.phar"));
        assert_eq!(config.signature, SignatureAlgorithm::Sha256);
    }

    #[test]
    #[serial]
    fn dotenv_values_are_read_and_env_wins() {
        clear_env();
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env"),
            "# build settings\nPHARC_ROOT=project\nPHARC_OUTPUT=\"dist/out.phar\"\nPHARC_SIGNATURE=sha256\n",
        )
        .unwrap();

        std::env::set_var(ENV_SIGNATURE, "sha512");
        let config = Config::load(dir.path()).unwrap();
        clear_env();

        assert_eq!(config.project_root, dir.path().join("project"));
        assert_eq!(config.output, dir.path().join("dist/out.phar"));
        assert_eq!(config.signature, SignatureAlgorithm::Sha512);
    }

    #[test]
    #[serial]
    fn unknown_signature_is_rejected() {
        clear_env();
        let dir = TempDir::new().unwrap();
        std::env::set_var(ENV_SIGNATURE, "md5");
        let result = Config::load(dir.path());
        clear_env();
        assert!(result.is_err());
    }
}
