//! Git CLI plumbing — bare mirrors and history extraction.
//!
//! Everything here shells out to `git`. Clone and fetch run under a hard
//! timeout; `git log` output is streamed straight into the parser and never
//! buffered whole.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::SentinelError;
use crate::model::Repository;

pub mod log;

pub use log::{GitLog, HistorySource, LOG_FORMAT};

/// Default bound on clone/fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(150);

/// Poll interval while waiting on a bounded subprocess.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for stderr once the process itself is gone. Descendants
/// that inherited the pipe can keep it open long after the parent exits.
const STDERR_GRACE: Duration = Duration::from_secs(2);

// ─── Subprocess helpers ─────────────────────────────────────────────

/// Outcome of a subprocess that ran to completion (or was killed).
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Read a child's stderr to the end on a helper thread so a chatty process
/// never blocks on a full pipe. The text arrives on the returned channel.
pub(crate) fn drain_stderr(child: &mut Child) -> Option<Receiver<String>> {
    let mut stderr = child.stderr.take()?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).trim().to_string());
    });
    Some(rx)
}

/// Collected stderr, or empty if it does not arrive within [`STDERR_GRACE`].
/// The drain thread is left behind in that case and exits with the pipe.
pub(crate) fn join_stderr(rx: Option<Receiver<String>>) -> String {
    rx.and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
        .unwrap_or_default()
}

/// Put the child in its own process group so a timeout can take down the
/// helpers git forks (`git-remote-https`, `index-pack`) along with it.
#[cfg(unix)]
fn isolate(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // The group id equals the child's pid (see `isolate`).
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall on a process group this process created.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Run a command to completion, killing it and its descendants if it exceeds
/// `timeout`.
///
/// Stdout is discarded; stderr is captured for diagnostics. A timeout is an
/// `Err` carrying a human-readable message, as is a spawn/wait failure.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<CommandOutput, String> {
    isolate(cmd);
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to execute git: {}. Is git installed and in PATH?", e))?;

    let stderr = drain_stderr(&mut child);
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(CommandOutput { status, stderr: join_stderr(stderr) });
            }
            Ok(None) if Instant::now() >= deadline => {
                kill_tree(&mut child);
                let _ = child.wait();
                let diag = join_stderr(stderr);
                return Err(if diag.is_empty() {
                    format!("timed out after {:?}", timeout)
                } else {
                    format!("timed out after {:?}: {}", timeout, diag)
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_tree(&mut child);
                let _ = child.wait();
                return Err(format!("Failed to wait for git: {}", e));
            }
        }
    }
}

// ─── Mirror store ───────────────────────────────────────────────────

/// What [`Mirror::ensure_fresh`] had to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorAction {
    Cloned,
    Fetched,
}

/// Keeps a local bare copy of a repository up to date.
pub trait Mirror {
    /// Clone the repository if absent, otherwise fetch all refs into it.
    fn ensure_fresh(&self, repo: &Repository) -> Result<MirrorAction, SentinelError>;

    /// Local mirror directory for `repo`.
    fn mirror_path(&self, repo: &Repository) -> PathBuf;
}

/// [`Mirror`] backed by `git clone --bare` / `git fetch`.
///
/// Owns everything under `data_dir`; no other component writes there.
pub struct GitMirror {
    data_dir: PathBuf,
    timeout: Duration,
}

impl GitMirror {
    pub fn new(data_dir: &Path, timeout: Duration) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            timeout,
        }
    }

    fn run(&self, repo: &Repository, cmd: &mut Command, what: &str) -> Result<(), SentinelError> {
        // Never block on a credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        let output = run_with_timeout(cmd, self.timeout).map_err(|message| {
            SentinelError::MirrorSync {
                repo: repo.name.clone(),
                message: format!("git {} {}", what, message),
            }
        })?;

        if !output.status.success() {
            return Err(SentinelError::MirrorSync {
                repo: repo.name.clone(),
                message: format!("git {} failed ({}): {}", what, output.status, output.stderr),
            });
        }
        debug!(repo = %repo.name, stderr = %output.stderr, "git {} finished", what);
        Ok(())
    }
}

impl Mirror for GitMirror {
    fn mirror_path(&self, repo: &Repository) -> PathBuf {
        self.data_dir.join(&repo.dir)
    }

    fn ensure_fresh(&self, repo: &Repository) -> Result<MirrorAction, SentinelError> {
        let path = self.mirror_path(repo);

        if !path.exists() {
            info!(repo = %repo.name, path = %path.display(), "Repository does not exist, cloning");
            let mut cmd = Command::new("git");
            cmd.current_dir(&self.data_dir)
                .args(["clone", "--bare", "--quiet", "--"])
                .arg(&repo.url)
                .arg(&repo.dir);
            if let Err(e) = self.run(repo, &mut cmd, "clone") {
                // Don't leave a partial clone for the next cycle to fetch into.
                let _ = std::fs::remove_dir_all(&path);
                return Err(e);
            }
            return Ok(MirrorAction::Cloned);
        }

        info!(repo = %repo.name, path = %path.display(), "Repository exists, fetching");
        let mut cmd = Command::new("git");
        cmd.current_dir(&path)
            .args(["fetch", "--quiet", "--force", "--"])
            .arg(&repo.url)
            .arg("+refs/*:refs/*");
        self.run(repo, &mut cmd, "fetch")?;
        Ok(MirrorAction::Fetched)
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
