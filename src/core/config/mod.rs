//! core::config
//!
//! Process-wide configuration defaults.
//!
//! GitGud has two configuration scopes (per `SPEC_FULL.md` §4.17):
//! - **Global**: `~/.config/gg/config.toml`, read once at startup. Seeds a
//!   repository's [`crate::core::model::Config`] the first time `init`/
//!   `clone` creates state for it.
//! - **Repo**: the `Config` embedded in `RepoState`, read/written via
//!   `get_config`/`set_config` and otherwise left alone by this module.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::core::model::Config;

#[derive(Debug, Error)]
pub enum GlobalConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The subset of [`Config`] fields a user may override process-wide.
/// Missing keys fall back to `Config::default()`.
#[derive(Debug, Default, Deserialize)]
struct GlobalConfigFile {
    remote_branch_prefix: Option<String>,
    randomize_branches: Option<bool>,
    verbose: Option<bool>,
    check_commits_on_status: Option<bool>,
}

/// Load process-wide defaults from `path`, falling back silently to
/// `Config::default()` when the file doesn't exist (it's optional).
pub fn load_global_defaults(path: &Path) -> Result<Config, GlobalConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| GlobalConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: GlobalConfigFile = toml::from_str(&raw).map_err(|source| GlobalConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut cfg = Config::default();
    if let Some(v) = file.remote_branch_prefix {
        cfg.remote_branch_prefix = v;
    }
    if let Some(v) = file.randomize_branches {
        cfg.randomize_branches = v;
    }
    if let Some(v) = file.verbose {
        cfg.verbose = v;
    }
    if let Some(v) = file.check_commits_on_status {
        cfg.check_commits_on_status = v;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_global_defaults(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_overrides_merge_onto_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "randomize_branches = true\n").unwrap();

        let cfg = load_global_defaults(&path).unwrap();
        assert!(cfg.randomize_branches);
        assert_eq!(cfg.remote_branch_prefix, Config::default().remote_branch_prefix);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid toml {{{").unwrap();
        assert!(load_global_defaults(&path).is_err());
    }
}
