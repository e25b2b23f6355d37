//! Unified error type for the ingestion pipeline.

use thiserror::Error;

/// All errors that can occur while mirroring, extracting, or persisting history.
///
/// Run-level kinds ([`SentinelError::Config`], [`SentinelError::Store`],
/// [`SentinelError::Io`]) abort the whole run. The remaining kinds are scoped to
/// one repository (or one commit) and are logged by the orchestrator.
#[derive(Error, Debug)]
pub enum SentinelError {
    /// Repository list or option problem. Always fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Clone/fetch of a mirror failed, timed out, or could not be spawned.
    #[error("[{repo}] mirror sync failed: {message}")]
    MirrorSync { repo: String, message: String },

    /// History extraction failed; any records parsed in this attempt are discarded.
    #[error("[{repo}] history extraction failed: {message}")]
    Parse { repo: String, message: String },

    /// A single commit could not be written.
    #[error("Failed to persist commit {hash}: {source}")]
    Persist {
        hash: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Datastore open, bootstrap, or query failure.
    #[error("Datastore error: {0}")]
    Store(#[from] rusqlite::Error),

    /// I/O error (data directory, repository list)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SentinelError {
    /// True when the error must terminate the run rather than one repository.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SentinelError::Config(_) | SentinelError::Store(_) | SentinelError::Io(_)
        )
    }
}
