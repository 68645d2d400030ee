//! Bucket hibernation model: pause/resume request parameters.

use serde::{Deserialize, Serialize};

/// Direction of a bucket hibernation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HibernationKind {
    /// Move the bucket out to blob storage.
    Pause,
    /// Bring the bucket back from blob storage.
    Resume,
}

impl HibernationKind {
    /// Wire prefix for remote paths and task id phases.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "hibernate",
            Self::Resume => "unhibernate",
        }
    }

    /// Decorate a remote path with this kind's prefix.
    pub fn decorate_path(&self, remote_path: &str) -> String {
        format!("{}:{}", self.as_str(), remote_path)
    }
}

impl std::fmt::Display for HibernationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for pausing a bucket to blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseParams {
    pub id: String,
    pub bucket: String,
    pub remote_path: String,
    #[serde(default)]
    pub blob_storage_region: String,
    #[serde(default)]
    pub rate_limit: u64,
    #[serde(default)]
    pub dry_run: bool,
}

/// Parameters for resuming a bucket from blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeParams {
    pub id: String,
    pub bucket: String,
    pub remote_path: String,
    #[serde(default)]
    pub blob_storage_region: String,
    #[serde(default)]
    pub rate_limit: u64,
    #[serde(default)]
    pub dry_run: bool,
}
