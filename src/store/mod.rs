//! Persistence gateway — idempotent commit storage keyed by hash.
//!
//! The [`CommitStore`] trait is the contract the rest of the pipeline depends
//! on; [`SqliteStore`] is the bundled engine.
//!
//! Upsert policy: first write wins. Re-submitting a stored hash is a no-op
//! reported as [`UpsertOutcome::Duplicate`], so a commit's `date` never changes
//! once written and watermarks stay stable.

mod sqlite;

pub use sqlite::SqliteStore;

use serde::Serialize;
use tracing::warn;

use crate::error::SentinelError;
use crate::model::Commit;

/// Result of a single upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The hash was already stored; nothing changed.
    Duplicate,
}

/// Per-repository aggregate read back from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    pub repo: String,
    pub commits: u64,
    pub latest_date: i64,
    pub insertions: u64,
    pub deletions: u64,
}

/// Storage contract used by the watermark tracker and the orchestrator.
pub trait CommitStore {
    /// Store `commit` unless its hash is already present.
    fn upsert(&self, commit: &Commit) -> Result<UpsertOutcome, SentinelError>;

    /// Maximum `date` among commits stored for `repo`.
    fn latest_date(&self, repo: &str) -> Result<Option<i64>, SentinelError>;

    fn commit_count(&self, repo: &str) -> Result<u64, SentinelError>;

    /// One summary per repository with at least one stored commit, by name.
    fn repositories(&self) -> Result<Vec<RepoSummary>, SentinelError>;
}

/// Counts from writing one repository's commits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Write every commit, logging and skipping the ones that fail.
pub fn persist_batch(store: &dyn CommitStore, repo: &str, commits: &[Commit]) -> BatchReport {
    let mut report = BatchReport::default();
    for commit in commits {
        match store.upsert(commit) {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                warn!(repo, hash = %commit.hash, error = %e, "error inserting row");
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
