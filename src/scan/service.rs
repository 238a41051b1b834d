//! The ingestion boundary: one explicitly constructed handle that owns the
//! ledger and export stores and maps caller requests onto them.

use anyhow::Result;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::ScanResult;
use crate::scan::config::ScanConfig;
use crate::scan::export::{ExportArtifact, ExportRow, ExportStore};
use crate::scan::ledger::{LedgerStatistics, LedgerStore, PartitionInfo};
use crate::scan::normalize::normalize;
use crate::scan::paths::ScanPaths;
use crate::scan::record::{CanonicalRecord, LedgerEntry, PartitionKey};
use crate::scan::retention::{self, SweepReport};

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub partition: PartitionKey,
    pub file: String,
    pub record: CanonicalRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Ingested(IngestOutcome),
    Exported(ExportArtifact),
}

#[derive(Debug)]
pub struct ScanService {
    paths: ScanPaths,
    config: ScanConfig,
    ledger: LedgerStore,
    exports: ExportStore,
}

/// Clients may wrap the record as `{"data": {...}}`.
fn unwrap_envelope(body: &Value) -> &Value {
    match body.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    }
}

fn export_row(item: &Value) -> ExportRow {
    ExportRow {
        record: normalize(item),
        timestamp: item
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

impl ScanService {
    /// Provision the storage directories and build the stores.
    pub fn open(paths: ScanPaths, config: ScanConfig) -> Result<Self> {
        paths.provision()?;
        let zone = config.partition_zone()?;
        let ledger = LedgerStore::new(&paths.data_dir, zone);
        let exports = ExportStore::new(&paths.exports_dir);
        info!(
            "event=service_open data_dir={} exports_dir={} timezone={} status=ok",
            paths.data_dir.display(),
            paths.exports_dir.display(),
            config.ledger.timezone
        );
        Ok(Self {
            paths,
            config,
            ledger,
            exports,
        })
    }

    pub fn paths(&self) -> &ScanPaths {
        &self.paths
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn exports(&self) -> &ExportStore {
        &self.exports
    }

    /// Normalize one submitted record and append it to today's partition.
    pub fn ingest(&self, body: &Value) -> ScanResult<IngestOutcome> {
        let record = normalize(unwrap_envelope(body));
        let partition = self.ledger.append(&record)?;
        info!("event=ingest key={partition} status=ok");
        Ok(IngestOutcome {
            partition,
            file: partition.file_name(),
            record,
        })
    }

    /// Export when the body asks for it with a non-empty batch, otherwise ingest.
    pub fn process(&self, body: &Value) -> ScanResult<ProcessOutcome> {
        let export_all = body
            .get("exportAll")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if export_all {
            if let Some(items) = body
                .get("data")
                .and_then(Value::as_array)
                .filter(|items| !items.is_empty())
            {
                return self.export(items).map(ProcessOutcome::Exported);
            }
        }
        self.ingest(body).map(ProcessOutcome::Ingested)
    }

    pub fn export(&self, items: &[Value]) -> ScanResult<ExportArtifact> {
        let rows: Vec<ExportRow> = items.iter().map(export_row).collect();
        self.exports.create_snapshot(&rows)
    }

    pub fn list_partitions(&self) -> ScanResult<Vec<PartitionInfo>> {
        self.ledger.list_partitions()
    }

    pub fn read_partition(&self, date: &str) -> ScanResult<Option<Vec<LedgerEntry>>> {
        self.ledger.read_partition(date)
    }

    pub fn statistics(&self) -> ScanResult<LedgerStatistics> {
        self.ledger.statistics()
    }

    /// Sweep with `max_age_days`, or the configured retention when `None`.
    pub fn purge(&self, max_age_days: Option<u32>) -> ScanResult<SweepReport> {
        let days = max_age_days.unwrap_or(self.config.retention.max_age_days);
        retention::purge(&self.ledger, days)
    }

    pub fn resolve_artifact(&self, artifact_id: &str) -> ScanResult<Option<PathBuf>> {
        self.exports.resolve_artifact_path(artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProcessOutcome, ScanService};
    use crate::scan::config::ScanConfig;
    use crate::scan::paths::ScanPaths;
    use serde_json::json;

    fn service(root: &std::path::Path) -> ScanService {
        let mut config = ScanConfig::default();
        config.ledger.timezone = "utc".to_string();
        ScanService::open(ScanPaths::under(root), config).expect("open")
    }

    #[test]
    fn ingest_unwraps_data_envelope() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let svc = service(tmp.path());
        let outcome = svc
            .ingest(&json!({"data": {"title": "Wrapped", "url": "www.example.com"}}))
            .expect("ingest");
        assert_eq!(outcome.record.title, "Wrapped");
        assert_eq!(outcome.record.publisher, "example.com");
        assert_eq!(outcome.file, format!("{}.csv", outcome.partition));

        let rows = svc
            .read_partition(&outcome.partition.to_string())
            .expect("read")
            .expect("present");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.url, "https://www.example.com");
    }

    #[test]
    fn non_object_body_is_stored_as_placeholder() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let svc = service(tmp.path());
        let outcome = svc.ingest(&json!(["not", "a", "record"])).expect("ingest");
        assert!(outcome.record.is_processing_error());
    }

    #[test]
    fn process_exports_only_with_flag_and_batch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let svc = service(tmp.path());

        let exported = svc
            .process(&json!({
                "exportAll": true,
                "data": [
                    {"title": "One", "timestamp": "2025-10-09T10:00:00"},
                    {"title": "Two"}
                ]
            }))
            .expect("process");
        let ProcessOutcome::Exported(artifact) = exported else {
            panic!("expected export");
        };
        assert_eq!(artifact.record_count, 2);
        assert!(artifact.path.starts_with(&svc.paths().exports_dir));
        let resolved = svc
            .resolve_artifact(&artifact.artifact_id.to_string())
            .expect("resolve");
        assert_eq!(resolved, Some(artifact.path.clone()));

        let ingested = svc
            .process(&json!({"exportAll": false, "data": {"title": "Single"}}))
            .expect("process");
        let ProcessOutcome::Ingested(outcome) = ingested else {
            panic!("expected ingest");
        };
        assert_eq!(outcome.record.title, "Single");

        assert!(svc.statistics().expect("stats").total_records >= 1);
        assert!(svc.list_partitions().expect("list").len() >= 1);
    }

    #[test]
    fn purge_defaults_to_configured_retention() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let svc = service(tmp.path());
        svc.ingest(&json!({"title": "fresh"})).expect("ingest");
        let report = svc.purge(None).expect("purge");
        assert_eq!(report.max_age_days, 30);
        assert!(report.deleted.is_empty());
    }
}
