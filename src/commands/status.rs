use anyhow::Result;
use std::env;

use surfscan::{load_config, resolve_paths};

use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/surfscan_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("surfscan_home={}", paths.surfscan_home.display()));
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("exports_dir={}", paths.exports_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));

    match load_config() {
        Ok(cfg) => {
            report.detail(format!("retention.max_age_days={}", cfg.retention.max_age_days));
            report.detail(format!("ledger.timezone={}", cfg.ledger.timezone));
            report.detail(format!("logging.level={}", cfg.logging.level));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    for key in GENERATED_SURFSCAN_ENV_ALLOWLIST {
        if let Ok(value) = env::var(key) {
            report.detail(format!("env.{key}={value}"));
        }
    }

    if !paths.data_dir.exists() {
        report.detail("data_dir missing (created on first write)");
    }
    if !paths.exports_dir.exists() {
        report.detail("exports_dir missing (created on first export)");
    }

    Ok(report)
}
