//! SurfScan ingestion core.
//!
//! Scanned article records are normalized ([`scan::normalize`]), appended to
//! daily CSV partitions ([`scan::ledger`]), exported as immutable snapshots
//! ([`scan::export`]) and swept by age ([`scan::retention`]). Callers reach
//! all of it through an explicitly opened [`ScanService`].

pub mod env_loader;
pub mod error;
pub mod logging;
pub mod scan;

pub use error::{ScanError, ScanResult};
pub use logging::{init_logging, logging_status};
pub use scan::config::{PartitionZone, ScanConfig, load_config};
pub use scan::export::{ExportArtifact, ExportRow, ExportStore};
pub use scan::ledger::{LedgerStatistics, LedgerStore, PartitionInfo};
pub use scan::normalize::normalize;
pub use scan::paths::{ScanPaths, resolve_paths};
pub use scan::record::{CanonicalRecord, LedgerEntry, PartitionKey};
pub use scan::retention::SweepReport;
pub use scan::service::{IngestOutcome, ProcessOutcome, ScanService};
