//! History extraction — runs `git log --shortstat` and streams it through the parser.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{drain_stderr, join_stderr};
use crate::error::SentinelError;
use crate::model::{Commit, Repository};
use crate::parser::{LineClassifier, ShortStatClassifier, parse_log_stream};
use crate::watermark::Since;

/// `--pretty` format producing one header line per commit: a record marker,
/// then author email, commit time, sanitized subject, short hash and ref names
/// separated by unit separators. Must stay in sync with
/// [`ShortStatClassifier`]'s header decoding.
pub const LOG_FORMAT: &str = "%x1e%aE%x1f%ct%x1f%f%x1f%h%x1f%D";

/// Source of parsed commit history for a mirrored repository.
pub trait HistorySource {
    /// Commits in `mirror` dated at or after `since`, in tool order.
    ///
    /// All-or-nothing: if extraction fails, no commits are returned.
    fn extract(
        &self,
        repo: &Repository,
        mirror: &Path,
        since: &Since,
    ) -> Result<Vec<Commit>, SentinelError>;
}

/// [`HistorySource`] backed by `git log --all --shortstat`.
pub struct GitLog<C: LineClassifier = ShortStatClassifier> {
    classifier: C,
    program: PathBuf,
}

impl GitLog<ShortStatClassifier> {
    pub fn new() -> Self {
        Self::with_classifier(ShortStatClassifier::new())
    }
}

impl Default for GitLog<ShortStatClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LineClassifier> GitLog<C> {
    pub fn with_classifier(classifier: C) -> Self {
        Self {
            classifier,
            program: PathBuf::from("git"),
        }
    }

    /// Run `program` instead of the `git` found in PATH.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to `git` for a given lower bound.
    pub fn log_args(since: &Since) -> Vec<String> {
        vec![
            "log".to_string(),
            "--all".to_string(),
            "--shortstat".to_string(),
            since.to_git_arg(),
            format!("--pretty=format:{}", LOG_FORMAT),
        ]
    }
}

impl<C: LineClassifier> HistorySource for GitLog<C> {
    fn extract(
        &self,
        repo: &Repository,
        mirror: &Path,
        since: &Since,
    ) -> Result<Vec<Commit>, SentinelError> {
        let parse_err = |message: String| SentinelError::Parse {
            repo: repo.name.clone(),
            message,
        };

        let mut child = Command::new(&self.program)
            .args(Self::log_args(since))
            .current_dir(mirror)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| parse_err(format!("Failed to spawn git log: {}", e)))?;

        let stderr = drain_stderr(&mut child);
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(parse_err("Failed to capture git log stdout".to_string()));
        };

        let parsed = parse_log_stream(BufReader::new(stdout), &repo.name, &self.classifier);

        let status = child
            .wait()
            .map_err(|e| parse_err(format!("Failed to wait for git log: {}", e)))?;
        let diag = join_stderr(stderr);

        if !status.success() {
            // Whatever was parsed before the failure is dropped here.
            return Err(parse_err(format!("git log exited with {}: {}", status, diag)));
        }
        let commits = parsed.map_err(|e| parse_err(format!("IO error reading git log: {}", e)))?;

        debug!(repo = %repo.name, commits = commits.len(), "git log finished");
        Ok(commits)
    }
}
