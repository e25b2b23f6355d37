//! Watermark tracking — decides where the next incremental extraction starts.

use crate::error::SentinelError;
use crate::store::CommitStore;

/// Lookback used for a repository that has never been ingested.
pub const DEFAULT_LOOKBACK: &str = "5 years ago";

/// Lower bound handed to the history tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Since {
    /// No watermark: bounded full history, as an approxidate expression.
    Lookback(String),
    /// Watermark present: commits dated at or after this timestamp.
    Epoch(i64),
}

impl Since {
    /// Choose the lower bound for a repository.
    ///
    /// The bound is inclusive: the boundary commit is fetched again and
    /// deduplicated by the store, so commits sharing the watermark second are
    /// never skipped.
    pub fn from_watermark(watermark: Option<i64>, lookback: &str) -> Self {
        match watermark {
            Some(ts) => Since::Epoch(ts),
            None => Since::Lookback(lookback.to_string()),
        }
    }

    /// Render as a `git log` argument.
    pub fn to_git_arg(&self) -> String {
        match self {
            Since::Lookback(expr) => format!("--since={}", expr),
            Since::Epoch(ts) => format!("--since={}", ts),
        }
    }
}

/// Latest persisted commit date for `repo`, or `None` when nothing is stored.
///
/// `None` and `Some(0)` are distinct: the former requests the lookback window.
pub fn latest_date(store: &dyn CommitStore, repo: &str) -> Result<Option<i64>, SentinelError> {
    store.latest_date(repo)
}
