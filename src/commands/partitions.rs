use anyhow::Result;

use crate::commands::{CommandReport, open_service};

pub fn run() -> Result<CommandReport> {
    let service = open_service()?;
    let mut report = CommandReport::new("partitions");
    report.detail(format!("data_dir={}", service.paths().data_dir.display()));

    match service.list_partitions() {
        Ok(partitions) => {
            report.detail(format!("count={}", partitions.len()));
            for p in partitions {
                report.detail(format!(
                    "partition={} rows={} bytes={} modified={}",
                    p.key,
                    p.row_count,
                    p.size_bytes,
                    p.last_modified.to_rfc3339()
                ));
            }
        }
        Err(err) => report.scan_error(&err),
    }
    Ok(report)
}
