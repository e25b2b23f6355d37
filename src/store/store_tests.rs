//! Unit tests for the persistence gateway.
//!
//! Uses in-memory SQLite databases, plus one on-disk database in a temp dir.

use super::*;
use std::cell::RefCell;
use std::collections::HashSet;

// ─── Test helpers ───────────────────────────────────────────────────

fn commit(hash: &str, repo: &str, date: i64) -> Commit {
    Commit {
        repo: repo.to_string(),
        author: "alice@example.com".to_string(),
        date,
        title: "Add-feature".to_string(),
        hash: hash.to_string(),
        refs: "HEAD -> main".to_string(),
        insertions: 12,
        deletions: 3,
    }
}

// ─── SqliteStore ────────────────────────────────────────────────────

#[test]
fn test_upsert_inserts_then_round_trips_fields() {
    let store = SqliteStore::open_in_memory().unwrap();
    let c = commit("abc1234", "demo", 1_700_000_000);

    assert_eq!(store.upsert(&c).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.get("abc1234").unwrap(), Some(c));
}

#[test]
fn test_upsert_same_commit_twice_leaves_one_row() {
    let store = SqliteStore::open_in_memory().unwrap();
    let c = commit("abc1234", "demo", 1_700_000_000);

    assert_eq!(store.upsert(&c).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(&c).unwrap(), UpsertOutcome::Duplicate);

    assert_eq!(store.commit_count("demo").unwrap(), 1);
    assert_eq!(store.get("abc1234").unwrap(), Some(c));
}

#[test]
fn test_upsert_conflicting_fields_keeps_first_write() {
    let store = SqliteStore::open_in_memory().unwrap();
    let first = commit("abc1234", "demo", 1_700_000_000);
    let mut second = first.clone();
    second.date = 1_800_000_000;
    second.insertions = 999;

    store.upsert(&first).unwrap();
    assert_eq!(store.upsert(&second).unwrap(), UpsertOutcome::Duplicate);

    let stored = store.get("abc1234").unwrap().unwrap();
    assert_eq!(stored.date, 1_700_000_000, "date must stay stable once written");
    assert_eq!(stored.insertions, 12);
    assert_eq!(store.latest_date("demo").unwrap(), Some(1_700_000_000));
}

#[test]
fn test_get_missing_hash() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(store.get("nope").unwrap(), None);
}

#[test]
fn test_commit_count_per_repo() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert(&commit("a1", "alpha", 1)).unwrap();
    store.upsert(&commit("a2", "alpha", 2)).unwrap();
    store.upsert(&commit("b1", "beta", 3)).unwrap();

    assert_eq!(store.commit_count("alpha").unwrap(), 2);
    assert_eq!(store.commit_count("beta").unwrap(), 1);
    assert_eq!(store.commit_count("gamma").unwrap(), 0);
}

#[test]
fn test_repositories_summary() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert(&commit("b1", "beta", 30)).unwrap();
    store.upsert(&commit("a1", "alpha", 10)).unwrap();
    store.upsert(&commit("a2", "alpha", 20)).unwrap();

    let summary = store.repositories().unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(
        summary[0],
        RepoSummary { repo: "alpha".into(), commits: 2, latest_date: 20, insertions: 24, deletions: 6 }
    );
    assert_eq!(summary[1].repo, "beta");
    assert_eq!(summary[1].latest_date, 30);
}

#[test]
fn test_bootstrap_is_idempotent_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("sentinel.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.upsert(&commit("keep01", "demo", 42)).unwrap();
        store.migrate().unwrap();
    }

    // Reopen: bootstrap runs again and must not disturb existing rows.
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.latest_date("demo").unwrap(), Some(42));
    assert_eq!(store.commit_count("demo").unwrap(), 1);
}

// ─── persist_batch ──────────────────────────────────────────────────

#[test]
fn test_persist_batch_counts_inserts_and_duplicates() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert(&commit("old", "demo", 1)).unwrap();

    let batch = vec![commit("old", "demo", 1), commit("new1", "demo", 2), commit("new2", "demo", 3)];
    let report = persist_batch(&store, "demo", &batch);

    assert_eq!(report, BatchReport { inserted: 2, duplicates: 1, failed: 0 });
    assert_eq!(store.commit_count("demo").unwrap(), 3);
}

/// Store that rejects a configured set of hashes and records the rest.
struct FlakyStore {
    reject: HashSet<String>,
    written: RefCell<Vec<String>>,
}

impl CommitStore for FlakyStore {
    fn upsert(&self, commit: &Commit) -> Result<UpsertOutcome, SentinelError> {
        if self.reject.contains(&commit.hash) {
            return Err(SentinelError::Persist {
                hash: commit.hash.clone(),
                source: rusqlite::Error::QueryReturnedNoRows,
            });
        }
        self.written.borrow_mut().push(commit.hash.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn latest_date(&self, _repo: &str) -> Result<Option<i64>, SentinelError> {
        Ok(None)
    }

    fn commit_count(&self, _repo: &str) -> Result<u64, SentinelError> {
        Ok(self.written.borrow().len() as u64)
    }

    fn repositories(&self) -> Result<Vec<RepoSummary>, SentinelError> {
        Ok(Vec::new())
    }
}

#[test]
fn test_persist_batch_continues_after_failure() {
    let store = FlakyStore {
        reject: ["bad".to_string()].into_iter().collect(),
        written: RefCell::new(Vec::new()),
    };
    let batch = vec![commit("c1", "demo", 1), commit("bad", "demo", 2), commit("c3", "demo", 3)];

    let report = persist_batch(&store, "demo", &batch);

    assert_eq!(report, BatchReport { inserted: 2, duplicates: 0, failed: 1 });
    assert_eq!(*store.written.borrow(), vec!["c1".to_string(), "c3".to_string()]);
}

#[test]
fn test_persist_batch_empty() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(persist_batch(&store, "demo", &[]), BatchReport::default());
}
