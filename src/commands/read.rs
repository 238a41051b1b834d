use anyhow::Result;

use crate::commands::{CommandReport, open_service};

pub fn run(date: &str) -> Result<CommandReport> {
    let service = open_service()?;
    let mut report = CommandReport::new("read");

    match service.read_partition(date) {
        Ok(Some(entries)) => {
            report.detail(format!("date={date}"));
            report.detail(format!("count={}", entries.len()));
            for entry in &entries {
                report.detail(serde_json::to_string(entry)?);
            }
        }
        Ok(None) => report.issue(format!("no data found for date: {date}")),
        Err(err) => report.scan_error(&err),
    }
    Ok(report)
}
