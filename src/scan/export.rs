use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ScanError, ScanResult};
use crate::scan::ledger::encode_row;
use crate::scan::record::{COLUMNS, CanonicalRecord};
use crate::scan::util::iso_timestamp;
use crate::scan::warn::{self, WarnEvent};

const EXPORT_PREFIX: &str = "export_";
const EXPORT_EXT: &str = "csv";
/// Characters of the artifact id carried in the file name.
pub const ID_FRAGMENT_CHARS: usize = 8;

/// One row of an export batch. `timestamp` is written verbatim when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub record: CanonicalRecord,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub artifact_id: Uuid,
    pub filename: String,
    pub path: PathBuf,
    pub record_count: usize,
}

#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: PathBuf,
}

fn id_fragment(artifact_id: &str) -> &str {
    match artifact_id.char_indices().nth(ID_FRAGMENT_CHARS) {
        Some((idx, _)) => &artifact_id[..idx],
        None => artifact_id,
    }
}

/// The id segment of an `export_<stamp>_<id>.csv` name.
fn id_segment(file_name: &str) -> Option<&str> {
    let stem = file_name
        .strip_prefix(EXPORT_PREFIX)?
        .strip_suffix(EXPORT_EXT)?
        .strip_suffix('.')?;
    stem.rsplit_once('_').map(|(_, id)| id)
}

fn artifact_filename(at: DateTime<Local>, artifact_id: &Uuid) -> String {
    let id = artifact_id.to_string();
    format!(
        "{EXPORT_PREFIX}{}_{}.{EXPORT_EXT}",
        at.format("%Y%m%d_%H%M%S"),
        id_fragment(&id)
    )
}

impl ExportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `rows` to a fresh artifact in one pass.
    ///
    /// The file is assembled under a temporary name and only appears under
    /// its final name once complete, so a reader never sees a partial export.
    pub fn create_snapshot(&self, rows: &[ExportRow]) -> ScanResult<ExportArtifact> {
        fs::create_dir_all(&self.dir).map_err(ScanError::artifact)?;

        let artifact_id = Uuid::new_v4();
        let filename = artifact_filename(Local::now(), &artifact_id);
        let path = self.dir.join(&filename);

        let mut tmp = tempfile::Builder::new()
            .prefix(".export-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(ScanError::artifact)?;
        tmp.write_all(&encode_row(COLUMNS).map_err(ScanError::artifact)?)
            .map_err(ScanError::artifact)?;
        for row in rows {
            let stamp = match &row.timestamp {
                Some(stamp) => stamp.clone(),
                None => iso_timestamp(&Local::now()),
            };
            let line = encode_row(row.record.to_row(&stamp)).map_err(ScanError::artifact)?;
            tmp.write_all(&line).map_err(ScanError::artifact)?;
        }
        tmp.flush().map_err(ScanError::artifact)?;
        tmp.persist_noclobber(&path)
            .map_err(|err| ScanError::artifact(err.error))?;

        info!(
            "event=export_created artifact_id={artifact_id} file={filename} rows={} status=ok",
            rows.len()
        );
        Ok(ExportArtifact {
            artifact_id,
            filename,
            path,
            record_count: rows.len(),
        })
    }

    /// Find the artifact for `artifact_id` by scanning export file names.
    ///
    /// File names only carry the first characters of the id, so the match is
    /// a substring test of that fragment against the id segment of each name.
    /// The timestamp segment is never searched: an id made of digits would
    /// otherwise hit every artifact written at a matching time. Two artifacts
    /// sharing a fragment are ambiguous; the lexically first one wins and a
    /// warning is logged.
    pub fn resolve_artifact_path(&self, artifact_id: &str) -> ScanResult<Option<PathBuf>> {
        let needle = id_fragment(artifact_id.trim());
        if needle.is_empty() {
            return Ok(None);
        }
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ScanError::namespace(&self.dir, err)),
        };

        let mut matches = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|err| ScanError::namespace(&self.dir, err))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if id_segment(name).is_some_and(|id| id.contains(needle)) {
                matches.push(entry.path());
            }
        }
        matches.sort();

        if matches.len() > 1 {
            warn::emit(WarnEvent {
                code: "ARTIFACT_AMBIGUOUS",
                stage: "export",
                action: "resolve-artifact",
                target: artifact_id,
                reason: "id-fragment-matches-multiple-files",
                err: &format!("{} candidates", matches.len()),
            });
        }
        Ok(matches.into_iter().next())
    }
}
