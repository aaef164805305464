//! Backend operations the promotion session depends on

use async_trait::async_trait;
use europa_core::domain::event::EventPage;
use europa_core::domain::pipeline::Pipeline;
use europa_core::domain::repo::Repo;
use europa_core::dto::pipeline::PromoteStage;
use europa_core::dto::repo::ListRepoEvents;

use crate::ConsoleClient;
use crate::error::Result;

/// Trait for the backend operations behind manual promotion
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Fetches the authoritative copy of a pipeline
    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline>;

    /// Lists the repositories visible to the caller
    async fn list_repos(&self) -> Result<Vec<Repo>>;

    /// Lists one page of events for a repository
    async fn list_repo_events(&self, query: ListRepoEvents) -> Result<EventPage>;

    /// Submits a manual promotion and returns the updated pipeline
    async fn run_manual_promotion(&self, request: PromoteStage) -> Result<Pipeline>;
}

#[async_trait]
impl PipelineApi for ConsoleClient {
    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        ConsoleClient::get_pipeline(self, pipeline_id).await
    }

    async fn list_repos(&self) -> Result<Vec<Repo>> {
        ConsoleClient::list_repos(self).await
    }

    async fn list_repo_events(&self, query: ListRepoEvents) -> Result<EventPage> {
        ConsoleClient::list_repo_events(self, query).await
    }

    async fn run_manual_promotion(&self, request: PromoteStage) -> Result<Pipeline> {
        ConsoleClient::run_manual_promotion(self, request).await
    }
}
