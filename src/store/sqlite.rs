//! SQLite-backed [`CommitStore`].

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, params};
use tracing::debug;

use super::{CommitStore, RepoSummary, UpsertOutcome};
use crate::error::SentinelError;
use crate::model::Commit;

/// Connection-level wait when another writer holds the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema bootstrap. Idempotent — safe on every startup.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS commits (
    hash TEXT NOT NULL PRIMARY KEY,
    repo TEXT NOT NULL,
    author TEXT NOT NULL,
    date INTEGER NOT NULL,
    title TEXT NOT NULL,
    ref TEXT NOT NULL DEFAULT '',
    additions INTEGER NOT NULL DEFAULT 0,
    deletions INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_commits_date ON commits(date);
CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author);
CREATE INDEX IF NOT EXISTS idx_commits_repo_date ON commits(repo, date);
";

/// Commit store over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and run the schema bootstrap.
    pub fn open(path: &Path) -> Result<Self, SentinelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened commit database");
        Self::bootstrap(conn)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, SentinelError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, SentinelError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Re-run the schema bootstrap on an open store.
    pub fn migrate(&self) -> Result<(), SentinelError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Fetch a stored commit by hash.
    pub fn get(&self, hash: &str) -> Result<Option<Commit>, SentinelError> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, repo, author, date, title, ref, additions, deletions
             FROM commits WHERE hash = ?1",
        )?;
        let mut rows = stmt.query_map(params![hash], |row| {
            Ok(Commit {
                hash: row.get(0)?,
                repo: row.get(1)?,
                author: row.get(2)?,
                date: row.get(3)?,
                title: row.get(4)?,
                refs: row.get(5)?,
                insertions: row.get::<_, i64>(6)?.max(0) as u64,
                deletions: row.get::<_, i64>(7)?.max(0) as u64,
            })
        })?;
        Ok(rows.next().transpose()?)
    }
}

impl CommitStore for SqliteStore {
    fn upsert(&self, commit: &Commit) -> Result<UpsertOutcome, SentinelError> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO commits (hash, repo, author, date, title, ref, additions, deletions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(hash) DO NOTHING",
                params![
                    commit.hash,
                    commit.repo,
                    commit.author,
                    commit.date,
                    commit.title,
                    commit.refs,
                    i64::try_from(commit.insertions).unwrap_or(i64::MAX),
                    i64::try_from(commit.deletions).unwrap_or(i64::MAX),
                ],
            )
            .map_err(|source| SentinelError::Persist {
                hash: commit.hash.clone(),
                source,
            })?;

        Ok(if changed == 0 {
            UpsertOutcome::Duplicate
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn latest_date(&self, repo: &str) -> Result<Option<i64>, SentinelError> {
        // MAX over zero rows yields NULL, which maps to None.
        let date: Option<i64> = self.conn.query_row(
            "SELECT MAX(date) FROM commits WHERE repo = ?1",
            params![repo],
            |row| row.get(0),
        )?;
        Ok(date)
    }

    fn commit_count(&self, repo: &str) -> Result<u64, SentinelError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE repo = ?1",
            params![repo],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn repositories(&self) -> Result<Vec<RepoSummary>, SentinelError> {
        let mut stmt = self.conn.prepare(
            "SELECT repo, COUNT(*), MAX(date), SUM(additions), SUM(deletions)
             FROM commits GROUP BY repo ORDER BY repo",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RepoSummary {
                    repo: row.get(0)?,
                    commits: row.get::<_, i64>(1)?.max(0) as u64,
                    latest_date: row.get(2)?,
                    insertions: row.get::<_, i64>(3)?.max(0) as u64,
                    deletions: row.get::<_, i64>(4)?.max(0) as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
