use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "surfscan",
    version,
    about = "Normalize scanned article records into daily CSV ledgers"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store one scan record (JSON object, optionally wrapped in `data`).
    Ingest {
        /// Read the JSON body from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Store one record, or export a batch when `exportAll` is set.
    Process {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// List daily partitions, newest first.
    Partitions,
    /// Print every row stored for one day.
    Read {
        /// Partition day, `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
    },
    /// Summarize stored partitions.
    Stats,
    /// Delete partitions older than the retention threshold.
    Purge {
        /// Overrides the configured `max_age_days`.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Locate an export artifact by id.
    Resolve {
        #[arg(long)]
        id: String,
    },
    /// Show resolved paths, configuration and environment overrides.
    Status,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let state = if report.ok { "ok" } else { "failed" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match cli.command {
        Command::Ingest { input } => commands::ingest::run(input.as_deref())?,
        Command::Process { input } => commands::process::run(input.as_deref())?,
        Command::Partitions => commands::partitions::run()?,
        Command::Read { date } => commands::read::run(&date)?,
        Command::Stats => commands::stats::run()?,
        Command::Purge { days } => commands::purge::run(days)?,
        Command::Resolve { id } => commands::resolve::run(&id)?,
        Command::Status => commands::status::run()?,
    };

    render(&report, cli.json)?;
    if !report.ok {
        bail!(
            "{} reported {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
