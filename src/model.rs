//! Core data types: repositories and commits.

use serde::{Deserialize, Serialize};

pub use crate::epoch::format_epoch;

// ─── Repository ─────────────────────────────────────────────────────

/// One repository being mirrored and ingested during a cycle.
///
/// Built from the repository list at startup, refreshed with a watermark once
/// per cycle, filled with newly parsed commits, then dropped. Nothing here
/// outlives the run; persisted state lives in the datastore.
#[derive(Clone, Debug)]
pub struct Repository {
    pub name: String,
    pub url: String,
    /// Mirror directory name under the data directory (e.g. `demo.git`).
    pub dir: String,
    /// Latest persisted commit date. `None` means nothing has been ingested yet.
    pub watermark: Option<i64>,
    pub commits: Vec<Commit>,
}

impl Repository {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            dir: mirror_dir_name(name, url),
            watermark: None,
            commits: Vec::new(),
        }
    }
}

/// Derive the bare mirror directory name from the remote URL.
///
/// Uses the last path segment with trailing `/` and `.git` stripped, then
/// appends `.git`. Falls back to the repository name when the URL has no
/// usable segment.
pub fn mirror_dir_name(name: &str, url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or("")
        .trim_end_matches(".git");

    let base = if segment.is_empty() || segment == "." || segment == ".." {
        name
    } else {
        segment
    };
    format!("{}.git", base)
}

// ─── Commit ─────────────────────────────────────────────────────────

/// A commit extracted from history, amended with aggregate line counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub repo: String,
    /// Author email as reported by the history tool.
    pub author: String,
    /// Committer timestamp, seconds since epoch.
    pub date: i64,
    /// Subject line in filename-safe form.
    pub title: String,
    /// Abbreviated hash. Primary key in the datastore.
    pub hash: String,
    /// Decorated ref names, possibly empty.
    #[serde(rename = "ref")]
    pub refs: String,
    pub insertions: u64,
    pub deletions: u64,
}

impl Commit {
    /// Build a commit from a decoded header with zeroed statistics.
    pub fn from_header(repo: &str, header: CommitHeader) -> Self {
        Self {
            repo: repo.to_string(),
            author: header.author,
            date: header.date,
            title: header.title,
            hash: header.hash,
            refs: header.refs,
            insertions: 0,
            deletions: 0,
        }
    }

    /// UTC rendering of [`Commit::date`].
    pub fn date_iso(&self) -> String {
        format_epoch(self.date)
    }
}

/// Fields decoded from the header line emitted once per commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitHeader {
    pub author: String,
    pub date: i64,
    pub title: String,
    pub hash: String,
    pub refs: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_dir_name_https() {
        assert_eq!(mirror_dir_name("demo", "https://github.com/org/demo.git"), "demo.git");
    }

    #[test]
    fn test_mirror_dir_name_no_suffix() {
        assert_eq!(mirror_dir_name("demo", "https://github.com/org/demo"), "demo.git");
    }

    #[test]
    fn test_mirror_dir_name_trailing_slash() {
        assert_eq!(mirror_dir_name("demo", "https://host/org/tools/"), "tools.git");
    }

    #[test]
    fn test_mirror_dir_name_scp_style() {
        assert_eq!(mirror_dir_name("x", "git@github.com:widgets.git"), "widgets.git");
    }

    #[test]
    fn test_mirror_dir_name_falls_back_to_name() {
        assert_eq!(mirror_dir_name("fallback", "/"), "fallback.git");
    }

    #[test]
    fn test_from_header_zeroes_stats() {
        let header = CommitHeader {
            author: "a@example.com".into(),
            date: 1_700_000_000,
            title: "Initial-commit".into(),
            hash: "abc1234".into(),
            refs: "HEAD -> main".into(),
        };
        let commit = Commit::from_header("demo", header);
        assert_eq!(commit.repo, "demo");
        assert_eq!(commit.hash, "abc1234");
        assert_eq!(commit.insertions, 0);
        assert_eq!(commit.deletions, 0);
    }
}
