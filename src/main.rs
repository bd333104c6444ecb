//! Dump fixup CLI.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sqldump_fixup::logging::{LogConfig, LogFormat, init_logging};
use sqldump_fixup::pipeline::{self, Outcome, Paths};
use sqldump_fixup::{Plan, report};

mod cli;

use crate::cli::{Cli, LogFormatArg};

/// Exit code when the run completed but a step needs manual attention.
const NEEDS_ATTENTION: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(outcome) if outcome.run.needs_attention() => ExitCode::from(NEEDS_ATTENTION),
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let (plan, source) = match &cli.plan {
        Some(path) => (Plan::load(path)?, path.display().to_string()),
        None => (
            Plan::builtin().context("built-in plan is invalid")?,
            "<built-in>".to_owned(),
        ),
    };
    let steps = plan
        .resolve()
        .with_context(|| format!("invalid plan {source}"))?;
    let paths = Paths::resolve(
        &plan,
        cli.input.clone(),
        cli.output.clone(),
        cli.snippet_dir.clone(),
    )?;

    let outcome = pipeline::execute(steps, &paths, cli.dry_run)?;
    print!("{}", report::render(&outcome.run, &outcome.written));

    match &cli.report_json {
        Some(path) if cli.dry_run => {
            tracing::info!(path = %path.display(), "dry run, JSON report not written");
        }
        Some(path) => report::write_json(path, &outcome.run.reports)?,
        None => {}
    }
    Ok(outcome)
}

/// Build logging configuration from CLI flags.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        log_file: cli.log_file.clone(),
        with_ansi: cli.log_file.is_none() && io::stderr().is_terminal(),
    }
}
