//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "sqldump-fixup",
    version,
    about = "Rewrite the INSERT statements of a data dump to match a newer schema",
    long_about = "Rewrite the INSERT statements of a data dump to match a newer schema.\n\n\
                  Without --plan, runs the built-in plan for local-data-dump.sql, writing\n\
                  local-data-dump-fixed.sql and the restore_*.sql snippets.\n\n\
                  Exits 0 when every step applied, 2 when a step needs manual attention,\n\
                  and 1 on error."
)]
pub struct Cli {
    /// Migration plan (TOML). Defaults to the built-in plan.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// Dump to read (overrides the plan).
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Corrected dump to write (overrides the plan).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory for snippet files (default: working directory).
    #[arg(long = "snippet-dir", value_name = "DIR")]
    pub snippet_dir: Option<PathBuf>,

    /// Run every step and report without writing any file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Also write the step reports as JSON (skipped on a dry run).
    #[arg(long = "report-json", value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per event.
    Json,
}
