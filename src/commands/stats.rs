use anyhow::Result;

use surfscan::PartitionKey;

use crate::commands::{CommandReport, open_service};

fn key_or_none(key: Option<PartitionKey>) -> String {
    key.map(|k| k.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub fn run() -> Result<CommandReport> {
    let service = open_service()?;
    let mut report = CommandReport::new("stats");

    match service.statistics() {
        Ok(stats) => {
            report.detail(format!("total_partitions={}", stats.total_partitions));
            report.detail(format!("total_records={}", stats.total_records));
            report.detail(format!(
                "latest_partition={}",
                key_or_none(stats.latest_partition)
            ));
            report.detail(format!(
                "oldest_partition={}",
                key_or_none(stats.oldest_partition)
            ));
            for p in &stats.recent {
                report.detail(format!("recent={} rows={}", p.key, p.row_count));
            }
        }
        Err(err) => report.scan_error(&err),
    }
    Ok(report)
}
