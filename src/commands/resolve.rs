use anyhow::Result;

use crate::commands::{CommandReport, open_service};

pub fn run(artifact_id: &str) -> Result<CommandReport> {
    let service = open_service()?;
    let mut report = CommandReport::new("resolve");

    match service.resolve_artifact(artifact_id) {
        Ok(Some(path)) => report.detail(format!("path={}", path.display())),
        Ok(None) => report.issue(format!("file not found: {artifact_id}")),
        Err(err) => report.scan_error(&err),
    }
    Ok(report)
}
