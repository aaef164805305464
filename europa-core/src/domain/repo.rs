//! Container repository domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::event::RepoEvent;

/// Container repository known to the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub name: String,
    #[serde(default)]
    pub provider: Option<RegistryProvider>,
    /// Most recent event, if the repository has seen any activity
    #[serde(default)]
    pub last_event: Option<RepoEvent>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub mirror: bool,
}

/// Registry hosting a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryProvider {
    Ecr,
    Gcr,
    Dockerhub,
    Private,
    Europa,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RegistryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryProvider::Ecr => write!(f, "ECR"),
            RegistryProvider::Gcr => write!(f, "GCR"),
            RegistryProvider::Dockerhub => write!(f, "Docker Hub"),
            RegistryProvider::Private => write!(f, "Private"),
            RegistryProvider::Europa => write!(f, "Europa"),
            RegistryProvider::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Repositories visible to the current user, keyed by id
///
/// A repository missing from the map is either deleted or not readable by
/// the caller; both cases are treated as missing data.
#[derive(Debug, Clone, Default)]
pub struct RepoMap {
    repos: HashMap<String, Repo>,
}

impl RepoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repo_id: &str) -> Option<&Repo> {
        self.repos.get(repo_id)
    }

    pub fn contains(&self, repo_id: &str) -> bool {
        self.repos.contains_key(repo_id)
    }

    pub fn insert(&mut self, repo: Repo) {
        self.repos.insert(repo.id.clone(), repo);
    }

    /// Find a repository by exact name
    pub fn find_by_name(&self, name: &str) -> Option<&Repo> {
        self.repos.values().find(|repo| repo.name == name)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repo> {
        self.repos.values()
    }
}

impl FromIterator<Repo> for RepoMap {
    fn from_iter<I: IntoIterator<Item = Repo>>(iter: I) -> Self {
        let mut map = RepoMap::new();
        for repo in iter {
            map.insert(repo);
        }
        map
    }
}

impl From<Vec<Repo>> for RepoMap {
    fn from(repos: Vec<Repo>) -> Self {
        repos.into_iter().collect()
    }
}
