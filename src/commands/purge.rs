use anyhow::Result;

use crate::commands::{CommandReport, audit, open_service};

pub fn run(days: Option<u32>) -> Result<CommandReport> {
    let service = open_service()?;
    let mut report = CommandReport::new("purge");

    match service.purge(days) {
        Ok(sweep) => {
            report.detail(format!("max_age_days={}", sweep.max_age_days));
            match sweep.cutoff {
                Some(cutoff) => report.detail(format!("cutoff={}", cutoff.to_rfc3339())),
                None => report.detail("cutoff=none"),
            }
            report.detail(format!("scanned={}", sweep.scanned));
            report.detail(format!("count={}", sweep.deleted.len()));
            for key in &sweep.deleted {
                report.detail(format!("deleted={}", key.file_name()));
            }
            // Partial failures are not fatal for the sweep.
            for key in &sweep.failed {
                report.detail(format!("failed={}", key.file_name()));
            }
            audit(
                &service,
                &mut report,
                &format!(
                    "max_age_days={} deleted={} failed={}",
                    sweep.max_age_days,
                    sweep.deleted.len(),
                    sweep.failed.len()
                ),
            );
        }
        Err(err) => {
            report.scan_error(&err);
            audit(&service, &mut report, &err.to_string());
        }
    }
    Ok(report)
}
