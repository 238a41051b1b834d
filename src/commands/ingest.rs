use anyhow::Result;
use std::path::Path;

use crate::commands::{CommandReport, audit, open_service, read_body};

pub fn run(input: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("ingest");
    let Some(body) = read_body(input)? else {
        report.issue("no JSON data provided");
        return Ok(report);
    };

    let service = open_service()?;
    match service.ingest(&body) {
        Ok(outcome) => {
            report.detail(format!("partition={}", outcome.partition));
            report.detail(format!("file={}", outcome.file));
            report.detail(format!("title={}", outcome.record.title));
            if outcome.record.is_processing_error() {
                report.detail("record=placeholder (payload was not a JSON object)");
            }
            audit(&service, &mut report, &format!("partition={}", outcome.partition));
        }
        Err(err) => {
            report.scan_error(&err);
            audit(&service, &mut report, &err.to_string());
        }
    }
    Ok(report)
}
