//! # sentinel — incremental git history ingestion
//!
//! Keeps bare mirrors of a list of remote repositories fresh, extracts commit
//! history newer than each repository's watermark, and stores one row per
//! commit (author, date, title, refs, inserted/deleted line counts) in SQLite.
//!
//! ## Library usage
//!
//! The `sentinel` binary is a thin CLI over this crate. Components meet at
//! traits ([`git::Mirror`], [`git::HistorySource`], [`store::CommitStore`]) so
//! the orchestrator can run against fakes in tests and benchmarks.

pub mod config;
pub mod epoch;
pub mod error;
pub mod git;
pub mod model;
pub mod parser;
pub mod store;
pub mod sync;
pub mod watermark;

pub use error::SentinelError;
pub use model::{Commit, CommitHeader, Repository};
pub use parser::{LineClassifier, LogStreamParser, ShortStatClassifier, parse_log_stream};
pub use store::{CommitStore, SqliteStore};
pub use sync::{CycleReport, Orchestrator};
