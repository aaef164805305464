//! Promotion session
//!
//! Drives a [`PromotionWorkflow`] against a [`PipelineApi`]. The workflow
//! decides what to request; the session performs the request and reports the
//! outcome back with the ticket it was issued, so a rejected or failed call
//! never leaves the workflow stuck in `Submitting`.

use std::sync::Arc;

use europa_core::domain::event::RepoEvent;
use europa_core::domain::pipeline::Pipeline;
use europa_core::domain::repo::RepoMap;
use europa_core::promotion::{EventsQuery, PageDirection, PromotionError, PromotionWorkflow};
use europa_core::stages::{SequenceError, locate_stage};
use europa_core::tag::is_digest;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::PipelineApi;
use crate::error::ClientError;

/// Errors surfaced by a promotion session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Promotion(#[from] PromotionError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Component {component_id} is not a stage of pipeline {pipeline_id}")]
    UnknownStage {
        pipeline_id: String,
        component_id: String,
    },

    #[error("Event {0} is not among the pushed images of the source repository")]
    UnknownEvent(String),
}

/// Manual promotion of one stage, backed by the console API
pub struct PromotionSession<A: PipelineApi> {
    api: Arc<A>,
    workflow: PromotionWorkflow,
    pipeline: Pipeline,
    repos: RepoMap,
}

impl<A: PipelineApi> PromotionSession<A> {
    /// Open the promotion panel on `component_id` and load the first page of
    /// source events
    ///
    /// The source repository is the one feeding the stage: the pipeline's own
    /// repository for the first stage, the previous stage's destination
    /// otherwise. A failed event listing does not fail the session; it stays
    /// on the workflow as a dismissible error and [`Self::load_events`] retries.
    pub async fn open(
        api: Arc<A>,
        pipeline: Pipeline,
        repos: RepoMap,
        component_id: &str,
    ) -> Result<Self, SessionError> {
        let workflow = {
            let stage = locate_stage(
                &pipeline.components,
                pipeline.container_repo_id.as_deref(),
                &repos,
                component_id,
            )?
            .ok_or_else(|| SessionError::UnknownStage {
                pipeline_id: pipeline.id.clone(),
                component_id: component_id.to_string(),
            })?;

            debug!(
                pipeline_id = %pipeline.id,
                component_id = %stage.component.id,
                source_repo_id = %stage.source_repo_id,
                automatic = stage.is_automatic,
                "Opening promotion"
            );
            PromotionWorkflow::open(
                pipeline.id.clone(),
                stage.source_repo_id,
                stage.component.clone(),
            )
        };

        let mut session = Self {
            api,
            workflow,
            pipeline,
            repos,
        };
        let query = session.workflow.show(&session.repos)?;
        // Already logged and left on the workflow
        let _ = session.fetch_events(query).await;

        Ok(session)
    }

    pub fn workflow(&self) -> &PromotionWorkflow {
        &self.workflow
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn repos(&self) -> &RepoMap {
        &self.repos
    }

    /// Reload the first page of source events
    pub async fn load_events(&mut self) -> Result<(), SessionError> {
        let query = self.workflow.refresh_events()?;
        self.fetch_events(query).await
    }

    /// Load the next or previous page of source events
    ///
    /// Returns `false` when there is no page in that direction.
    pub async fn page_events(&mut self, direction: PageDirection) -> Result<bool, SessionError> {
        match self.workflow.page_events(direction)? {
            Some(query) => {
                self.fetch_events(query).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Refetch the pipeline and repositories
    ///
    /// The promotion is checked against the refreshed copies on confirm.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let pipeline = self.api.get_pipeline(&self.pipeline.id).await?;
        let repos = self.api.list_repos().await?;
        self.pipeline = pipeline;
        self.repos = repos.into();
        Ok(())
    }

    pub fn set_event_filter(&mut self, filter: impl Into<String>) {
        self.workflow.set_event_filter(filter);
    }

    /// Pick a visible source event by id, or by image digest
    pub fn select_event_by_id(&mut self, event_id: &str) -> Result<(), SessionError> {
        let by_digest = is_digest(event_id);
        let event = self
            .find_visible(|e| {
                if by_digest {
                    e.image_sha.as_deref() == Some(event_id)
                } else {
                    e.id == event_id
                }
            })
            .ok_or_else(|| SessionError::UnknownEvent(event_id.to_string()))?;
        self.workflow.select_event(event)?;
        Ok(())
    }

    /// Pick the newest visible source event
    ///
    /// Returns `false` when there is nothing to pick.
    pub fn select_latest_event(&mut self) -> Result<bool, SessionError> {
        match self.find_visible(|_| true) {
            Some(event) => {
                self.workflow.select_event(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_destination_tag(&mut self, tag: impl Into<String>) -> Result<(), SessionError> {
        self.workflow.set_destination_tag(tag)?;
        Ok(())
    }

    /// Submit the promotion
    ///
    /// On success the updated pipeline replaces the session's copy and is
    /// returned. On failure the selection is kept for a retry.
    pub async fn confirm(&mut self) -> Result<Pipeline, SessionError> {
        let command = match self.workflow.confirm(&self.pipeline, &self.repos) {
            Ok(command) => command,
            Err(e) => {
                warn!(pipeline_id = %self.pipeline.id, error = %e, "Promotion rejected locally");
                return Err(e.into());
            }
        };

        debug!(
            pipeline_id = %command.request.pipeline_id,
            component_id = %command.request.component_id,
            destination_tag = %command.request.destination_tag,
            "Submitting promotion"
        );

        match self.api.run_manual_promotion(command.request).await {
            Ok(pipeline) => {
                let pipeline = self
                    .workflow
                    .promotion_succeeded(command.ticket, pipeline)
                    .ok_or(PromotionError::Closed)?;
                info!(pipeline_id = %pipeline.id, "Promotion committed");
                self.pipeline = pipeline.clone();
                Ok(pipeline)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(pipeline_id = %self.pipeline.id, error = %message, "Promotion failed");
                self.workflow.promotion_failed(command.ticket, message.clone());
                let error = self
                    .workflow
                    .error()
                    .cloned()
                    .unwrap_or(PromotionError::Backend(message));
                Err(error.into())
            }
        }
    }

    /// Close the panel without promoting
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.workflow.cancel()?;
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.workflow.dismiss_error();
    }

    async fn fetch_events(&mut self, query: EventsQuery) -> Result<(), SessionError> {
        let outcome = self
            .api
            .list_repo_events(query.query)
            .await
            .map_err(|e| e.user_message());
        self.workflow.events_loaded(query.ticket, outcome);

        match self.workflow.error() {
            Some(e @ PromotionError::EventsUnavailable(_)) => {
                warn!(error = %e, "Failed to load repository events");
                Err(e.clone().into())
            }
            _ => Ok(()),
        }
    }

    fn find_visible(&self, predicate: impl Fn(&RepoEvent) -> bool) -> Option<RepoEvent> {
        self.workflow
            .visible_events()
            .into_iter()
            .find(|e| predicate(*e))
            .cloned()
    }
}
