//! Sync orchestrator — drives each repository through one ingestion cycle.
//!
//! Per repository: `Pending → Mirroring → Watermarking → Extracting →
//! Persisting → Done`. A failure at any stage ends that repository as
//! `Failed(stage)` and the cycle moves on to the next one. Nothing is retried
//! within a cycle; the next invocation of the whole pipeline is the retry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::error::SentinelError;
use crate::git::{HistorySource, Mirror, MirrorAction};
use crate::model::Repository;
use crate::store::{BatchReport, CommitStore, persist_batch};
use crate::watermark::{self, Since};

/// Where a repository is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Mirroring,
    Watermarking,
    Extracting,
    Persisting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pending => "pending",
            Stage::Mirroring => "mirroring",
            Stage::Watermarking => "watermarking",
            Stage::Extracting => "extracting",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal state of one repository after a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoStatus {
    Done {
        action: MirrorAction,
        /// Watermark read before extraction (`None` on first ingestion).
        watermark: Option<i64>,
        extracted: usize,
        batch: BatchReport,
    },
    Failed { stage: Stage, error: String },
    /// Never started because the cycle was interrupted.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoOutcome {
    pub name: String,
    pub status: RepoStatus,
}

/// Summary of one pass over the repository list.
#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<RepoOutcome>,
    pub interrupted: bool,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RepoStatus::Done { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RepoStatus::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RepoStatus::Skipped))
            .count()
    }

    /// Total rows newly written across all repositories.
    pub fn inserted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                RepoStatus::Done { batch, .. } => batch.inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, name: &str) -> Option<&RepoOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// Runs repositories sequentially against the given collaborators.
pub struct Orchestrator<'a> {
    mirror: &'a dyn Mirror,
    history: &'a dyn HistorySource,
    store: &'a dyn CommitStore,
    lookback: String,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        mirror: &'a dyn Mirror,
        history: &'a dyn HistorySource,
        store: &'a dyn CommitStore,
        lookback: &str,
    ) -> Self {
        Self {
            mirror,
            history,
            store,
            lookback: lookback.to_string(),
            interrupt: None,
        }
    }

    /// Stop before the next repository once `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Process every repository in list order and report each outcome.
    pub fn run_cycle(&self, repos: Vec<Repository>) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();

        for mut repo in repos {
            if report.interrupted || self.interrupted() {
                if !report.interrupted {
                    warn!(repo = %repo.name, "Interrupted, skipping remaining repositories");
                }
                report.interrupted = true;
                report.outcomes.push(RepoOutcome { name: repo.name, status: RepoStatus::Skipped });
                continue;
            }

            let status = match self.process(&mut repo) {
                Ok(status) => status,
                Err((stage, e)) => {
                    warn!(repo = %repo.name, %stage, error = %e, "Repository failed");
                    RepoStatus::Failed { stage, error: e.to_string() }
                }
            };
            report.outcomes.push(RepoOutcome { name: repo.name, status });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            inserted = report.inserted(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cycle finished"
        );
        report
    }

    /// One repository through all stages. Commits are released once persisted.
    pub fn process(&self, repo: &mut Repository) -> Result<RepoStatus, (Stage, SentinelError)> {
        let start = Instant::now();

        info!(repo = %repo.name, stage = %Stage::Mirroring, "Syncing mirror");
        let action = self
            .mirror
            .ensure_fresh(repo)
            .map_err(|e| (Stage::Mirroring, e))?;

        info!(repo = %repo.name, stage = %Stage::Watermarking, "Reading watermark");
        repo.watermark = watermark::latest_date(self.store, &repo.name)
            .map_err(|e| (Stage::Watermarking, e))?;
        let since = Since::from_watermark(repo.watermark, &self.lookback);

        info!(repo = %repo.name, stage = %Stage::Extracting, since = %since.to_git_arg(), "Extracting history");
        let path = self.mirror.mirror_path(repo);
        repo.commits = self
            .history
            .extract(repo, &path, &since)
            .map_err(|e| (Stage::Extracting, e))?;
        let extracted = repo.commits.len();

        info!(repo = %repo.name, stage = %Stage::Persisting, commits = extracted, "Persisting commits");
        let batch = persist_batch(self.store, &repo.name, &repo.commits);
        repo.commits = Vec::new();

        info!(
            repo = %repo.name,
            stage = %Stage::Done,
            inserted = batch.inserted,
            duplicates = batch.duplicates,
            failed = batch.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Repository synced"
        );
        Ok(RepoStatus::Done {
            action,
            watermark: repo.watermark,
            extracted,
            batch,
        })
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
