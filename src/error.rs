use std::path::PathBuf;

use thiserror::Error;

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("partition {key} io failure: {cause}")]
    PartitionIo { key: String, cause: String },
    #[error("export artifact io failure: {cause}")]
    ArtifactIo { cause: String },
    #[error("invalid partition key `{0}`: expected YYYY-MM-DD")]
    InvalidPartitionKey(String),
    #[error("failed to enumerate {}: {cause}", path.display())]
    NamespaceIo { path: PathBuf, cause: String },
    #[error("storage root {} is not writable: {cause}", path.display())]
    Provision { path: PathBuf, cause: String },
}

impl ScanError {
    pub fn partition(key: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::PartitionIo {
            key: key.into(),
            cause: cause.to_string(),
        }
    }

    pub fn artifact(cause: impl std::fmt::Display) -> Self {
        Self::ArtifactIo {
            cause: cause.to_string(),
        }
    }

    pub fn namespace(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::NamespaceIo {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Stable short code, used in structured log lines and CLI issues.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PartitionIo { .. } => "E001_PARTITION_IO",
            Self::ArtifactIo { .. } => "E002_ARTIFACT_IO",
            Self::InvalidPartitionKey(_) => "E003_INVALID_PARTITION_KEY",
            Self::NamespaceIo { .. } => "E004_NAMESPACE_IO",
            Self::Provision { .. } => "E005_PROVISION",
        }
    }
}
