//! Daily append-only CSV partitions.
//!
//! One file per calendar day, `<data_dir>/<YYYY-MM-DD>.csv`, header first,
//! rows in arrival order. Appends to the same day serialize on a per-key
//! mutex and an advisory file lock; appends to different days do not contend.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ScanError, ScanResult};
use crate::scan::config::PartitionZone;
use crate::scan::record::{COLUMNS, CanonicalRecord, LedgerEntry, PartitionKey};
use crate::scan::util::system_time_to_utc;
use crate::scan::warn::{self, WarnEvent};

const EXPORT_PREFIX: &str = "export_";
const PARTITION_EXT: &str = "csv";
const RECENT_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub key: PartitionKey,
    pub file_name: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStatistics {
    pub total_partitions: usize,
    pub total_records: usize,
    pub latest_partition: Option<PartitionKey>,
    pub oldest_partition: Option<PartitionKey>,
    pub recent: Vec<PartitionInfo>,
}

#[derive(Debug, Clone)]
pub(crate) struct PartitionFile {
    pub key: PartitionKey,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct LedgerStore {
    dir: PathBuf,
    zone: PartitionZone,
    locks: Mutex<HashMap<PartitionKey, Arc<Mutex<()>>>>,
}

pub(crate) fn encode_row(fields: [&str; 7]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>, zone: PartitionZone) -> Self {
        Self {
            dir: dir.into(),
            zone,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn zone(&self) -> PartitionZone {
        self.zone
    }

    pub fn partition_path(&self, key: PartitionKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn key_lock(&self, key: PartitionKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        // Entries only the map still references belong to idle days.
        locks.retain(|held, lock| *held == key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Append to today's partition on the server clock.
    pub fn append(&self, record: &CanonicalRecord) -> ScanResult<PartitionKey> {
        self.append_at(record, Utc::now())
    }

    /// Append as if the store received `record` at `now`.
    pub fn append_at(
        &self,
        record: &CanonicalRecord,
        now: DateTime<Utc>,
    ) -> ScanResult<PartitionKey> {
        let key = PartitionKey::from_date(self.zone.date_of(now));
        let time_received = self.zone.timestamp(now);
        let row = encode_row(record.to_row(&time_received))
            .map_err(|err| ScanError::partition(key.to_string(), err))?;

        let lock = self.key_lock(key);
        let _guard = lock.lock();

        let path = self.partition_path(key);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| ScanError::partition(key.to_string(), err))?;
        FileExt::lock_exclusive(&file).map_err(|err| ScanError::partition(key.to_string(), err))?;
        let fresh = file
            .metadata()
            .map_err(|err| ScanError::partition(key.to_string(), err))?
            .len()
            == 0;
        write_locked(file, fresh, &path, key, &row)?;

        debug!("event=ledger_append key={key} bytes={} status=ok", row.len());
        Ok(key)
    }

    /// Every partition file currently in the ledger directory, unordered.
    pub(crate) fn partition_files(&self) -> ScanResult<Vec<PartitionFile>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ScanError::namespace(&self.dir, err)),
        };

        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|err| ScanError::namespace(&self.dir, err))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(PARTITION_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with(EXPORT_PREFIX) {
                continue;
            }
            let Ok(key) = PartitionKey::parse(stem) else {
                continue;
            };
            out.push(PartitionFile { key, path });
        }
        Ok(out)
    }

    /// Partition metadata, most recent day first.
    pub fn list_partitions(&self) -> ScanResult<Vec<PartitionInfo>> {
        let mut out = Vec::new();
        for file in self.partition_files()? {
            let meta = match fs::metadata(&file.path) {
                Ok(meta) => meta,
                // Swept between enumeration and stat.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(ScanError::partition(file.key.to_string(), err)),
            };
            let row_count = count_rows(&file.path).unwrap_or_else(|err| {
                warn::emit(WarnEvent {
                    code: "PARTITION_UNREADABLE",
                    stage: "ledger",
                    action: "count-rows",
                    target: &file.key.to_string(),
                    reason: "read-failed",
                    err: &err,
                });
                0
            });
            out.push(PartitionInfo {
                key: file.key,
                file_name: file.key.file_name(),
                size_bytes: meta.len(),
                last_modified: meta
                    .modified()
                    .map(system_time_to_utc)
                    .unwrap_or_default(),
                row_count,
            });
        }
        out.sort_by(|a, b| b.key.cmp(&a.key));
        Ok(out)
    }

    /// All rows of one day, or `None` when that day has no partition.
    pub fn read_partition(&self, key: &str) -> ScanResult<Option<Vec<LedgerEntry>>> {
        let key = PartitionKey::parse(key)?;
        let path = self.partition_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ScanError::partition(key.to_string(), err)),
        };
        FileExt::lock_shared(&file).map_err(|err| ScanError::partition(key.to_string(), err))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(&file);
        let mut entries = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|err| ScanError::partition(key.to_string(), err))?;
            entries.push(LedgerEntry::from_row(&row));
        }
        Ok(Some(entries))
    }

    pub fn statistics(&self) -> ScanResult<LedgerStatistics> {
        let partitions = self.list_partitions()?;
        Ok(LedgerStatistics {
            total_partitions: partitions.len(),
            total_records: partitions.iter().map(|p| p.row_count).sum(),
            latest_partition: partitions.first().map(|p| p.key),
            oldest_partition: partitions.last().map(|p| p.key),
            recent: partitions.into_iter().take(RECENT_SAMPLE).collect(),
        })
    }
}

/// Write `row` to a partition the caller holds the lock for. A `fresh` (empty)
/// partition gets the header first; if that fails the file is removed.
fn write_locked<W: Write>(
    mut out: W,
    fresh: bool,
    path: &Path,
    key: PartitionKey,
    row: &[u8],
) -> ScanResult<()> {
    if fresh {
        let header =
            encode_row(COLUMNS).map_err(|err| ScanError::partition(key.to_string(), err))?;
        if let Err(err) = out.write_all(&header) {
            drop(out);
            let _ = fs::remove_file(path);
            return Err(ScanError::partition(
                key.to_string(),
                format!("failed to write header: {err}"),
            ));
        }
        info!("event=partition_created key={key} path={} status=ok", path.display());
    }
    out.write_all(row)
        .map_err(|err| ScanError::partition(key.to_string(), err))
}

fn count_rows(path: &Path) -> Result<usize, String> {
    let file = File::open(path).map_err(|err| err.to_string())?;
    FileExt::lock_shared(&file).map_err(|err| err.to_string())?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(&file);
    let mut count = 0usize;
    for row in reader.byte_records() {
        row.map_err(|err| err.to_string())?;
        count += 1;
    }
    Ok(count)
}
