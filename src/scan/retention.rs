use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use crate::error::ScanResult;
use crate::scan::ledger::LedgerStore;
use crate::scan::record::PartitionKey;
use crate::scan::util::system_time_to_utc;
use crate::scan::warn::{self, WarnEvent};

const SECS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub max_age_days: u32,
    /// Partitions last modified before this instant were deleted. `None` when
    /// the threshold reaches past the earliest representable time.
    pub cutoff: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub deleted: Vec<PartitionKey>,
    pub failed: Vec<PartitionKey>,
}

/// `now - max_age_days * 24h`, or `None` when that instant is out of range.
pub fn cutoff_for(now: DateTime<Utc>, max_age_days: u32) -> Option<DateTime<Utc>> {
    let max_age_secs = i64::from(max_age_days).saturating_mul(SECS_PER_DAY);
    Duration::try_seconds(max_age_secs).and_then(|age| now.checked_sub_signed(age))
}

pub fn purge(ledger: &LedgerStore, max_age_days: u32) -> ScanResult<SweepReport> {
    purge_at(ledger, Utc::now(), max_age_days)
}

/// Delete ledger partitions last modified more than `max_age_days * 24h`
/// before `now`. Export artifacts are never considered. A failed deletion is
/// reported in `failed` and the sweep goes on.
pub fn purge_at(
    ledger: &LedgerStore,
    now: DateTime<Utc>,
    max_age_days: u32,
) -> ScanResult<SweepReport> {
    purge_with(ledger, now, max_age_days, |path| fs::remove_file(path))
}

pub(crate) fn purge_with<F>(
    ledger: &LedgerStore,
    now: DateTime<Utc>,
    max_age_days: u32,
    remove: F,
) -> ScanResult<SweepReport>
where
    F: Fn(&Path) -> io::Result<()>,
{
    let mut files = ledger.partition_files()?;
    files.sort_by_key(|file| file.key);

    let cutoff = cutoff_for(now, max_age_days);
    let mut report = SweepReport {
        max_age_days,
        cutoff,
        scanned: files.len(),
        deleted: Vec::new(),
        failed: Vec::new(),
    };
    let Some(cutoff) = cutoff else {
        info!("event=sweep_complete max_age_days={max_age_days} status=skipped reason=cutoff-out-of-range");
        return Ok(report);
    };

    for file in files {
        let key = file.key.to_string();
        let modified = match fs::metadata(&file.path).and_then(|meta| meta.modified()) {
            Ok(modified) => system_time_to_utc(modified),
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "SWEEP_STAT_FAILED",
                    stage: "retention",
                    action: "stat-partition",
                    target: &key,
                    reason: "metadata-unavailable",
                    err: &err.to_string(),
                });
                report.failed.push(file.key);
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match remove(&file.path) {
            Ok(()) => {
                info!("event=partition_deleted key={key} modified={} status=ok", modified.to_rfc3339());
                report.deleted.push(file.key);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "SWEEP_DELETE_FAILED",
                    stage: "retention",
                    action: "remove-partition",
                    target: &key,
                    reason: "remove-failed",
                    err: &err.to_string(),
                });
                report.failed.push(file.key);
            }
        }
    }

    info!(
        "event=sweep_complete max_age_days={max_age_days} scanned={} deleted={} failed={}",
        report.scanned,
        report.deleted.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{cutoff_for, purge_at, purge_with};
    use crate::scan::config::PartitionZone;
    use crate::scan::ledger::LedgerStore;
    use crate::scan::record::CanonicalRecord;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::time::SystemTime;

    fn set_age(path: &std::path::Path, now: chrono::DateTime<Utc>, age: Duration) {
        let when: SystemTime = (now - age).into();
        fs::File::options()
            .append(true)
            .open(path)
            .expect("open")
            .set_modified(when)
            .expect("set mtime");
    }

    #[test]
    fn only_partitions_past_threshold_are_deleted() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path(), PartitionZone::Utc);
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();

        let mut expected_deleted = Vec::new();
        for age in [5i64, 29, 30, 31, 90] {
            let key = store
                .append_at(&CanonicalRecord::processing_error(), now - Duration::days(age))
                .expect("append");
            set_age(&store.partition_path(key), now, Duration::days(age));
            if age > 30 {
                expected_deleted.push(key);
            }
        }
        expected_deleted.sort();

        let report = purge_at(&store, now, 30).expect("purge");
        assert_eq!(report.scanned, 5);
        assert_eq!(report.deleted, expected_deleted);
        assert!(report.failed.is_empty());

        let remaining = store.list_partitions().expect("list");
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn export_namespace_is_left_alone() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path(), PartitionZone::Utc);
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();

        let exports = tmp.path().join("exports");
        fs::create_dir_all(&exports).expect("mkdir");
        let nested = exports.join("export_20200101_000000_deadbeef.csv");
        let sibling = tmp.path().join("export_20200101_000000_cafebabe.csv");
        for path in [&nested, &sibling] {
            fs::write(path, "title\n").expect("write");
            set_age(path, now, Duration::days(400));
        }

        let report = purge_at(&store, now, 1).expect("purge");
        assert!(report.deleted.is_empty());
        assert!(nested.exists());
        assert!(sibling.exists());
    }

    #[test]
    fn missing_ledger_dir_sweeps_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path().join("absent"), PartitionZone::Utc);
        let report = purge_at(&store, Utc::now(), 30).expect("purge");
        assert_eq!(report.scanned, 0);
    }

    #[test]
    fn part_of_a_day_past_threshold_is_enough() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path(), PartitionZone::Utc);
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();

        let stale_age = Duration::days(30) + Duration::hours(12);
        let stale = store
            .append_at(&CanonicalRecord::processing_error(), now - stale_age)
            .expect("append");
        set_age(&store.partition_path(stale), now, stale_age);

        let fresh_age = Duration::days(29) + Duration::hours(23);
        let fresh = store
            .append_at(&CanonicalRecord::processing_error(), now - fresh_age)
            .expect("append");
        set_age(&store.partition_path(fresh), now, fresh_age);

        let report = purge_at(&store, now, 30).expect("purge");
        assert_eq!(report.deleted, vec![stale]);
        assert_eq!(report.cutoff, Some(now - Duration::days(30)));
        assert!(store.partition_path(fresh).exists());
    }

    #[test]
    fn huge_threshold_deletes_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path(), PartitionZone::Utc);
        let now = Utc::now();
        let key = store
            .append_at(&CanonicalRecord::processing_error(), now)
            .expect("append");
        set_age(&store.partition_path(key), now, Duration::days(3650));

        for days in [100_000_000, u32::MAX] {
            let report = purge_at(&store, now, days).expect("purge");
            assert!(report.cutoff.is_none());
            assert!(report.deleted.is_empty());
        }
        assert!(store.partition_path(key).exists());
        assert!(cutoff_for(now, 36_500).is_some());
    }

    #[test]
    fn failed_delete_is_reported_and_sweep_continues() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LedgerStore::new(tmp.path(), PartitionZone::Utc);
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();

        let mut keys = Vec::new();
        for age in [40i64, 50, 60] {
            let key = store
                .append_at(&CanonicalRecord::processing_error(), now - Duration::days(age))
                .expect("append");
            set_age(&store.partition_path(key), now, Duration::days(age));
            keys.push(key);
        }
        keys.sort();
        let stuck = store.partition_path(keys[1]);

        let report = purge_with(&store, now, 30, |path| {
            if path == stuck {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                ))
            } else {
                fs::remove_file(path)
            }
        })
        .expect("purge");

        assert_eq!(report.failed, vec![keys[1]]);
        assert_eq!(report.deleted, vec![keys[0], keys[2]]);
        assert!(stuck.exists());
        assert!(!store.partition_path(keys[0]).exists());
        assert!(!store.partition_path(keys[2]).exists());
    }
}
