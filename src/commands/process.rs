use anyhow::Result;
use std::path::Path;
use surfscan::ProcessOutcome;

use crate::commands::{CommandReport, audit, open_service, read_body};

pub fn run(input: Option<&Path>) -> Result<CommandReport> {
    let mut report = CommandReport::new("process");
    let Some(body) = read_body(input)? else {
        report.issue("no JSON data provided");
        return Ok(report);
    };

    let service = open_service()?;
    match service.process(&body) {
        Ok(ProcessOutcome::Exported(artifact)) => {
            report.detail(format!("file_id={}", artifact.artifact_id));
            report.detail(format!("filename={}", artifact.filename));
            report.detail(format!("download=/api/download/{}", artifact.artifact_id));
            report.detail(format!("record_count={}", artifact.record_count));
            audit(
                &service,
                &mut report,
                &format!("export {} records={}", artifact.filename, artifact.record_count),
            );
        }
        Ok(ProcessOutcome::Ingested(outcome)) => {
            report.detail(format!("partition={}", outcome.partition));
            report.detail(format!("file={}", outcome.file));
            audit(&service, &mut report, &format!("partition={}", outcome.partition));
        }
        Err(err) => {
            report.scan_error(&err);
            audit(&service, &mut report, &err.to_string());
        }
    }
    Ok(report)
}
