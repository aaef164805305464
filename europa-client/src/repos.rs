//! Repository-related operations

use crate::error::{ClientError, Result};
use crate::{ConsoleClient, Params};
use europa_core::domain::event::EventPage;
use europa_core::domain::manifest::ManifestPage;
use europa_core::domain::repo::Repo;
use europa_core::dto::repo::{CreateLocalRepo, CreateRepoMirror, ListRepoEvents, ListRepoManifests};
use europa_core::tag::is_valid_repo_name;

impl ConsoleClient {
    // =============================================================================
    // Repositories
    // =============================================================================

    /// List the repositories visible to the caller
    pub async fn list_repos(&self) -> Result<Vec<Repo>> {
        self.ajax_get("ListContainerRepos", Params::new()).await
    }

    /// Get a repository by ID
    pub async fn get_repo(&self, repo_id: &str) -> Result<Repo> {
        if repo_id.is_empty() {
            return Err(ClientError::InvalidRequest("Repository ID is empty".to_string()));
        }
        self.ajax_get("GetContainerRepo", vec![("id", repo_id.to_string())])
            .await
    }

    /// Create a repository hosted by the console
    ///
    /// The name is checked locally before anything is sent.
    ///
    /// # Returns
    /// The created repository
    pub async fn create_local_repo(&self, req: CreateLocalRepo) -> Result<Repo> {
        check_repo_name(&req.repo_name)?;
        self.ajax_post("CreateLocalRepo", vec![("repoName", req.repo_name)])
            .await
    }

    /// Create a local repository mirroring `source_repo_id`
    ///
    /// # Returns
    /// The created mirror
    pub async fn create_repo_mirror(&self, req: CreateRepoMirror) -> Result<Repo> {
        check_repo_name(&req.repo_name)?;
        if req.source_repo_id.is_empty() {
            return Err(ClientError::InvalidRequest(
                "Invalid source repository".to_string(),
            ));
        }
        self.ajax_post(
            "CreateRepoMirror",
            vec![
                ("repoName", req.repo_name),
                ("sourceRepoId", req.source_repo_id),
            ],
        )
        .await
    }

    /// Delete a repository
    ///
    /// The backend refuses to delete the source of a mirror.
    pub async fn delete_repo(&self, repo_id: &str) -> Result<()> {
        self.ajax_post_empty("DeleteContainerRepo", vec![("id", repo_id.to_string())])
            .await
    }

    // =============================================================================
    // Events and Manifests
    // =============================================================================

    /// List one page of events for a repository
    ///
    /// `backward` is only sent when set; the backend pages towards older
    /// events by default.
    pub async fn list_repo_events(&self, req: ListRepoEvents) -> Result<EventPage> {
        let params = page_params(req.repo_id, req.marker, req.backward);
        self.ajax_get("ListRepoEvents", params).await
    }

    /// List one page of image manifests stored in a repository
    pub async fn list_repo_manifests(&self, req: ListRepoManifests) -> Result<ManifestPage> {
        let params = page_params(req.repo_id, req.marker, req.backward);
        self.ajax_get("ListRepoManifests", params).await
    }
}

fn page_params<'a>(repo_id: String, marker: Option<String>, backward: bool) -> Params<'a> {
    let mut params: Params<'a> = vec![("repoId", repo_id)];
    if let Some(marker) = marker {
        params.push(("marker", marker));
    }
    if backward {
        params.push(("backward", "true".to_string()));
    }
    params
}

fn check_repo_name(name: &str) -> Result<()> {
    if is_valid_repo_name(name) {
        Ok(())
    } else {
        Err(ClientError::InvalidRequest(format!(
            "Invalid repository name: '{}'",
            name
        )))
    }
}
