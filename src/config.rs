//! Run configuration and the repository list.
//!
//! Options are gathered once at startup (CLI flags with `SENTINEL_*` env
//! fallbacks, see `cli::args`) into an immutable [`Settings`] that is handed to
//! each component. Nothing reads the environment after that.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::SentinelError;
use crate::git::DEFAULT_TIMEOUT;
use crate::model::Repository;
use crate::watermark::DEFAULT_LOOKBACK;

/// Default repository list file name, resolved against the working directory.
pub const DEFAULT_REPO_LIST: &str = "sentinel.yaml";

/// Database file name inside the data directory when no path is given.
pub const DEFAULT_DB_FILE: &str = "sentinel.db";

/// Everything a sync cycle needs to know, resolved once.
#[derive(Clone, Debug)]
pub struct Settings {
    pub repo_list: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub git_timeout: Duration,
    /// Approxidate expression bounding the first sync of a repository.
    pub lookback: String,
}

impl Settings {
    /// Settings with defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            repo_list: PathBuf::from(DEFAULT_REPO_LIST),
            data_dir: data_dir.to_path_buf(),
            db_path: data_dir.join(DEFAULT_DB_FILE),
            git_timeout: DEFAULT_TIMEOUT,
            lookback: DEFAULT_LOOKBACK.to_string(),
        }
    }
}

/// Default data directory: `<local data dir>/sentinel`, or `./sentinel-data`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|base| base.join("sentinel"))
        .unwrap_or_else(|| PathBuf::from("sentinel-data"))
}

// ─── Repository list ────────────────────────────────────────────────

/// One entry of the repository list document.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepoSpec {
    pub name: String,
    pub url: String,
}

/// Decode a repository list (YAML sequence of `{name, url}`), preserving order.
///
/// JSON documents are accepted too, being valid YAML. Names must be unique, and
/// so must the mirror directories derived from the URLs.
pub fn parse_repo_list(text: &str) -> Result<Vec<Repository>, SentinelError> {
    let specs: Vec<RepoSpec> = serde_yaml::from_str(text)
        .map_err(|e| SentinelError::Config(format!("Failed to parse repository list: {}", e)))?;

    let mut seen = HashSet::new();
    let mut mirror_dirs: HashMap<String, String> = HashMap::new();
    let mut repos = Vec::with_capacity(specs.len());
    for (i, spec) in specs.into_iter().enumerate() {
        let name = spec.name.trim();
        let url = spec.url.trim();
        if name.is_empty() {
            return Err(SentinelError::Config(format!("Repository #{} has an empty name", i + 1)));
        }
        if url.is_empty() {
            return Err(SentinelError::Config(format!("Repository '{}' has an empty url", name)));
        }
        if !seen.insert(name.to_string()) {
            return Err(SentinelError::Config(format!("Duplicate repository name '{}'", name)));
        }
        let repo = Repository::new(name, url);
        if let Some(other) = mirror_dirs.insert(repo.dir.clone(), repo.name.clone()) {
            return Err(SentinelError::Config(format!(
                "Repositories '{}' and '{}' would share mirror directory '{}'",
                other, repo.name, repo.dir
            )));
        }
        repos.push(repo);
    }
    Ok(repos)
}

/// Read and decode the repository list file. Any failure is fatal.
pub fn load_repo_list(path: &Path) -> Result<Vec<Repository>, SentinelError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SentinelError::Config(format!(
            "Failed to read repository definition '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_repo_list(&text)
}

// ─── Data directory ─────────────────────────────────────────────────

/// Create the data directory (owner-only on Unix) if it does not exist.
pub fn prepare_data_dir(path: &Path) -> Result<(), SentinelError> {
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).map_err(|e| {
        SentinelError::Config(format!(
            "Failed to create data directory '{}': {}",
            path.display(),
            e
        ))
    })
}
