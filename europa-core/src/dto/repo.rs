//! Repository DTOs

use serde::{Deserialize, Serialize};

/// Query for one page of repository events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRepoEvents {
    pub repo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Page towards newer events instead of older ones
    #[serde(default)]
    pub backward: bool,
}

impl ListRepoEvents {
    /// First page of events for a repository
    pub fn first_page(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            marker: None,
            backward: false,
        }
    }
}

/// Query for one page of image manifests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRepoManifests {
    pub repo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Page towards newer manifests instead of older ones
    #[serde(default)]
    pub backward: bool,
}

/// Request to create a repository hosted by the console itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocalRepo {
    pub repo_name: String,
}

/// Request to create a local repository mirroring another one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepoMirror {
    pub repo_name: String,
    pub source_repo_id: String,
}
