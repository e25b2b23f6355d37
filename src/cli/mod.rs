//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sentinel::config::{load_repo_list, prepare_data_dir};
use sentinel::git::{GitLog, GitMirror};
use sentinel::model::{Repository, format_epoch};
use sentinel::store::{CommitStore, RepoSummary, SqliteStore};
use sentinel::sync::{CycleReport, Orchestrator, RepoStatus};
use sentinel::SentinelError;

// ─── CLI ─────────────────────────────────────────────────────────────

/// Incremental git history mirror and commit ingestion
#[derive(Parser, Debug)]
#[command(name = "sentinel", version, about, after_help = "\
Run 'sentinel <COMMAND> --help' for detailed options.\n\
Every option can also be set through a SENTINEL_* environment variable.")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run one ingestion cycle over the repository list
    Sync(SyncArgs),

    /// Show stored commit counts and watermarks per repository
    Status(StatusArgs),
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Commands::Sync(args) => &args.common,
            Commands::Status(args) => &args.common,
        }
    }
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let common = cli.command.common();
    init_tracing(&common.log_level, common.log_format);

    let result = match cli.command {
        Commands::Sync(args) => cmd_sync(args),
        Commands::Status(args) => cmd_status(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!(error = %e, "Run aborted");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` directives when set and valid, otherwise the `--log-level` value.
fn log_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

/// Install the process-wide subscriber. Logs always go to stderr.
fn init_tracing(level: &str, format: LogFormat) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ─── sync ───────────────────────────────────────────────────────────

fn cmd_sync(args: SyncArgs) -> Result<i32, SentinelError> {
    let settings = args.settings();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        build = env!("SENTINEL_BUILD_ID"),
        repo_list = %settings.repo_list.display(),
        data_dir = %settings.data_dir.display(),
        "Starting sentinel"
    );

    let repos = select_repos(load_repo_list(&settings.repo_list)?, &args.only)?;
    prepare_data_dir(&settings.data_dir)?;
    let store = SqliteStore::open(&settings.db_path)?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "Failed to install interrupt handler");
    }

    let mirror = GitMirror::new(&settings.data_dir, settings.git_timeout);
    let history = GitLog::new();
    let report = Orchestrator::new(&mirror, &history, &store, &settings.lookback)
        .with_interrupt(interrupt)
        .run_cycle(repos);

    print!("{}", render_report(&report));
    Ok(exit_code(&report, args.fail_on_error))
}

/// Keep only the repositories named in `only` (all of them when empty).
pub(crate) fn select_repos(
    repos: Vec<Repository>,
    only: &[String],
) -> Result<Vec<Repository>, SentinelError> {
    if only.is_empty() {
        return Ok(repos);
    }
    if let Some(unknown) = only.iter().find(|n| !repos.iter().any(|r| &r.name == *n)) {
        return Err(SentinelError::Config(format!(
            "Repository '{}' is not in the repository list",
            unknown
        )));
    }
    Ok(repos.into_iter().filter(|r| only.contains(&r.name)).collect())
}

/// 130 when interrupted, 1 on repository failures with `--fail-on-error`, else 0.
pub(crate) fn exit_code(report: &CycleReport, fail_on_error: bool) -> i32 {
    if report.interrupted {
        130
    } else if fail_on_error && report.failed() > 0 {
        1
    } else {
        0
    }
}

pub(crate) fn render_report(report: &CycleReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let line = match &outcome.status {
            RepoStatus::Done { extracted, batch, .. } => format!(
                "ok       {}: {} extracted, {} new, {} already stored, {} failed",
                outcome.name, extracted, batch.inserted, batch.duplicates, batch.failed
            ),
            RepoStatus::Failed { stage, error } => {
                format!("FAILED   {} ({}): {}", outcome.name, stage, error)
            }
            RepoStatus::Skipped => format!("skipped  {}", outcome.name),
        };
        let _ = writeln!(out, "{}", line);
    }
    let _ = writeln!(
        out,
        "\n{} synced, {} failed, {} skipped, {} new commits",
        report.succeeded(),
        report.failed(),
        report.skipped(),
        report.inserted()
    );
    out
}

// ─── status ─────────────────────────────────────────────────────────

fn cmd_status(args: StatusArgs) -> Result<i32, SentinelError> {
    let db_path = args.common.db_path();
    if !db_path.exists() {
        return Err(SentinelError::Config(format!(
            "No database at '{}'. Run 'sentinel sync' first.",
            db_path.display()
        )));
    }
    let store = SqliteStore::open(&db_path)?;
    let summaries = store.repositories()?;
    if args.json {
        println!("{}", render_status_json(&summaries)?);
    } else {
        print!("{}", render_status(&summaries));
    }
    Ok(0)
}

/// Summaries as a JSON array, with the watermark also rendered as UTC.
pub(crate) fn render_status_json(summaries: &[RepoSummary]) -> Result<String, SentinelError> {
    let mut rows = Vec::with_capacity(summaries.len());
    for s in summaries {
        let mut row = serde_json::to_value(s).map_err(std::io::Error::from)?;
        row["latest_date_utc"] = serde_json::Value::String(format_epoch(s.latest_date));
        rows.push(row);
    }
    Ok(serde_json::to_string_pretty(&rows).map_err(std::io::Error::from)?)
}

pub(crate) fn render_status(summaries: &[RepoSummary]) -> String {
    if summaries.is_empty() {
        return "No commits stored yet.\n".to_string();
    }
    let width = summaries
        .iter()
        .map(|s| s.repo.len())
        .max()
        .unwrap_or(0)
        .max("REPOSITORY".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>10}  {:>10}  WATERMARK",
        "REPOSITORY", "COMMITS", "+LINES", "-LINES"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>10}  {:>10}  {}",
            s.repo,
            s.commits,
            s.insertions,
            s.deletions,
            format_epoch(s.latest_date)
        );
    }
    out
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
