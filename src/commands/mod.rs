pub mod ingest;
pub mod partitions;
pub mod process;
pub mod purge;
pub mod read;
pub mod resolve;
pub mod stats;
pub mod status;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

use surfscan::scan::audit;
use surfscan::{ScanError, ScanService, init_logging, load_config, resolve_paths};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn scan_error(&mut self, err: &ScanError) {
        self.issue(format!("{}: {err}", err.code()));
    }
}

/// Resolve paths and config, start logging, and open the service.
pub fn open_service() -> Result<ScanService> {
    let paths = resolve_paths()?;
    let config = load_config()?;
    if let Err(err) = init_logging(&config.logging.level, &paths.logs_dir) {
        eprintln!("surfscan logging disabled: {err}");
    }
    ScanService::open(paths, config)
}

/// Read a JSON request body from `input` or stdin.
///
/// `Ok(None)` means the body was empty. Text that is not JSON is passed on as
/// a JSON string so normalization records it as a processing error.
pub fn read_body(input: Option<&Path>) -> Result<Option<Value>> {
    let raw = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(
        serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw)),
    ))
}

pub fn audit(service: &ScanService, report: &mut CommandReport, message: &str) {
    let status = if report.ok { "ok" } else { "failed" };
    if let Err(err) = audit::append_event(service.paths(), &report.command, status, message) {
        report.detail(format!("audit.write_failed={err:#}"));
    }
}
