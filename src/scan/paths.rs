use anyhow::Result;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

#[derive(Debug, Clone)]
pub struct ScanPaths {
    pub surfscan_home: PathBuf,
    pub data_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn surfscan_home() -> Result<PathBuf> {
    match env::var("SURFSCAN_HOME") {
        Ok(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => Ok(required_home_dir()?.join(".surfscan")),
    }
}

pub fn resolve_paths() -> Result<ScanPaths> {
    let surfscan_home = surfscan_home()?;
    let data_dir = env_or_default_path("SURFSCAN_DATA_DIR", surfscan_home.join("data"));
    let exports_dir = env_or_default_path("SURFSCAN_EXPORTS_DIR", data_dir.join("exports"));
    let logs_dir = env_or_default_path("SURFSCAN_LOGS_DIR", surfscan_home.join("logs"));

    Ok(ScanPaths {
        surfscan_home,
        data_dir,
        exports_dir,
        logs_dir,
    })
}

impl ScanPaths {
    /// Lay out every directory under one root, ignoring the environment.
    pub fn under(root: &Path) -> Self {
        let data_dir = root.join("data");
        Self {
            surfscan_home: root.to_path_buf(),
            exports_dir: data_dir.join("exports"),
            data_dir,
            logs_dir: root.join("logs"),
        }
    }

    /// Create the storage directories. Failing here means the service cannot run.
    pub fn provision(&self) -> Result<(), ScanError> {
        for dir in [&self.data_dir, &self.exports_dir, &self.logs_dir] {
            fs::create_dir_all(dir).map_err(|err| ScanError::Provision {
                path: dir.clone(),
                cause: err.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ScanPaths;
    use std::path::Path;

    #[test]
    fn exports_live_inside_data_dir_by_default() {
        let paths = ScanPaths::under(Path::new("/srv/surfscan"));
        assert_eq!(paths.data_dir, Path::new("/srv/surfscan/data"));
        assert_eq!(paths.exports_dir, Path::new("/srv/surfscan/data/exports"));
        assert_eq!(paths.logs_dir, Path::new("/srv/surfscan/logs"));
    }

    #[test]
    fn provision_creates_all_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = ScanPaths::under(tmp.path());
        paths.provision().expect("provision");
        assert!(paths.data_dir.is_dir());
        assert!(paths.exports_dir.is_dir());
        assert!(paths.logs_dir.is_dir());
    }
}
