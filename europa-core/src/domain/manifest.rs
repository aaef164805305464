//! Image manifest domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image manifest stored in a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoManifest {
    /// Content digest of the manifest
    pub manifest_id: String,
    #[serde(default)]
    pub container_repo_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub push_time: Option<i64>,
    /// Uncompressed image size in bytes
    #[serde(default)]
    pub virtual_size: Option<u64>,
}

impl RepoManifest {
    pub fn push_time_utc(&self) -> Option<DateTime<Utc>> {
        self.push_time.and_then(DateTime::from_timestamp_millis)
    }
}

/// One page of manifests with its pagination markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPage {
    #[serde(default, rename = "list")]
    pub manifests: Vec<RepoManifest>,
    #[serde(default, rename = "prev")]
    pub prev_marker: Option<String>,
    #[serde(default, rename = "next")]
    pub next_marker: Option<String>,
}
