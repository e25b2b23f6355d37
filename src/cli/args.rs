//! CLI argument structs for all subcommands.
//!
//! Every option can also be supplied through a `SENTINEL_*` environment
//! variable; an explicit flag wins over the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use sentinel::config::{DEFAULT_DB_FILE, DEFAULT_REPO_LIST, Settings, default_data_dir};
use sentinel::watermark::DEFAULT_LOOKBACK;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, env = "SENTINEL_LOG_LEVEL", default_value = "info",
          value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "SENTINEL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Directory holding the bare mirrors (default: <local data dir>/sentinel)
    #[arg(long, env = "SENTINEL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// SQLite database file (default: <data dir>/sentinel.db)
    #[arg(long, env = "SENTINEL_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl CommonArgs {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(DEFAULT_DB_FILE))
    }
}

#[derive(Parser, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// YAML file listing the repositories to ingest (`- name: ...` / `url: ...`)
    #[arg(long, env = "SENTINEL_REPO_LIST", default_value = DEFAULT_REPO_LIST)]
    pub repo_list: PathBuf,

    /// Timeout in seconds for each clone/fetch
    #[arg(long, env = "SENTINEL_GIT_TIMEOUT_SECS", default_value = "150")]
    pub git_timeout_secs: u64,

    /// History window for repositories with nothing ingested yet (git approxidate)
    #[arg(long, env = "SENTINEL_LOOKBACK", default_value = DEFAULT_LOOKBACK)]
    pub lookback: String,

    /// Only sync the named repositories (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Exit with status 1 if any repository failed
    #[arg(long)]
    pub fail_on_error: bool,
}

impl SyncArgs {
    /// Resolve defaults into the immutable run settings.
    pub fn settings(&self) -> Settings {
        let data_dir = self.common.data_dir();
        Settings {
            repo_list: self.repo_list.clone(),
            db_path: self.common.db_path(),
            data_dir,
            git_timeout: Duration::from_secs(self.git_timeout_secs),
            lookback: self.lookback.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
