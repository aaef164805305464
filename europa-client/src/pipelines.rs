//! Pipeline-related operations

use crate::error::Result;
use crate::{ConsoleClient, Params};
use europa_core::domain::pipeline::Pipeline;
use europa_core::dto::pipeline::{
    AddComponent, CreatePipeline, MoveComponent, NewComponent, PromoteStage, RemoveComponent,
    SetContainerRepo,
};
use europa_core::stages::{GateToggle, plan_gate_toggle};
use tracing::{error, warn};

impl ConsoleClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// List all pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        self.ajax_get("ListPipelines", Params::new()).await
    }

    /// Get a pipeline by ID
    ///
    /// # Arguments
    /// * `pipeline_id` - The pipeline id (`"<domain>:<id>"`)
    pub async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        self.ajax_get("GetPipeline", vec![("pipelineId", pipeline_id.to_string())])
            .await
    }

    /// Create a new pipeline
    ///
    /// # Returns
    /// The created pipeline, with no source repository and no components
    pub async fn create_pipeline(&self, req: CreatePipeline) -> Result<Pipeline> {
        self.ajax_post("NewPipeline", vec![("name", req.name)]).await
    }

    /// Delete a pipeline
    pub async fn remove_pipeline(&self, pipeline_id: &str) -> Result<()> {
        self.ajax_post_empty("RemovePipeline", vec![("pipelineId", pipeline_id.to_string())])
            .await
    }

    /// Connect a source repository to a pipeline
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn set_container_repo(&self, req: SetContainerRepo) -> Result<Pipeline> {
        self.ajax_post(
            "SetPipelineContainerRepoId",
            vec![
                ("pipelineId", req.pipeline_id),
                ("containerRepoId", req.container_repo_id),
            ],
        )
        .await
    }

    /// Disconnect the source repository of a pipeline
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn delete_container_repo(&self, pipeline_id: &str) -> Result<Pipeline> {
        self.ajax_post(
            "DeletePipelineContainerRepoId",
            vec![("pipelineId", pipeline_id.to_string())],
        )
        .await
    }

    // =============================================================================
    // Pipeline Components
    // =============================================================================

    /// Insert a component, before another component or at the end
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn add_component(&self, req: AddComponent) -> Result<Pipeline> {
        let mut params: Params<'_> = vec![
            ("type", req.component.kind().as_str().to_string()),
            ("pipelineId", req.pipeline_id),
        ];
        if let Some(before) = req.before_component_id {
            params.push(("beforeComponentId", before));
        }

        self.ajax_post_json("AddPipelineComponent", params, &req.component.content())
            .await
    }

    /// Move a component to a new position
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn move_component(&self, req: MoveComponent) -> Result<Pipeline> {
        self.ajax_post(
            "MovePipelineComponent",
            vec![
                ("pipelineId", req.pipeline_id),
                ("pipelineComponentId", req.pipeline_component_id),
                ("targetIndex", req.target_index.to_string()),
            ],
        )
        .await
    }

    /// Remove a component
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn remove_component(&self, req: RemoveComponent) -> Result<Pipeline> {
        self.ajax_post(
            "RemovePipelineComponent",
            vec![
                ("pipelineComponentId", req.pipeline_component_id),
                ("pipelineId", req.pipeline_id),
            ],
        )
        .await
    }

    /// Remove a copy stage together with the gate in front of it
    ///
    /// The gate goes first so it never ends up governing the next stage. If
    /// the stage itself cannot be removed, the gate is put back and that
    /// error is returned.
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn remove_stage(&self, pipeline: &Pipeline, component_id: &str) -> Result<Pipeline> {
        let gate = match plan_gate_toggle(&pipeline.components, component_id) {
            Some(GateToggle::RemoveGate { gate_id }) => Some(gate_id),
            _ => None,
        };

        if let Some(gate_id) = &gate {
            self.remove_component(RemoveComponent {
                pipeline_id: pipeline.id.clone(),
                pipeline_component_id: gate_id.clone(),
            })
            .await?;
        }

        let err = match self
            .remove_component(RemoveComponent {
                pipeline_id: pipeline.id.clone(),
                pipeline_component_id: component_id.to_string(),
            })
            .await
        {
            Ok(updated) => return Ok(updated),
            Err(e) => e,
        };

        if gate.is_some() {
            warn!(
                pipeline_id = %pipeline.id,
                component_id,
                "Stage removal failed, restoring its manual promotion gate"
            );
            let restored = self
                .add_component(AddComponent {
                    pipeline_id: pipeline.id.clone(),
                    component: NewComponent::ManualPromotionGate,
                    before_component_id: Some(component_id.to_string()),
                })
                .await;
            if let Err(e) = restored {
                error!(
                    pipeline_id = %pipeline.id,
                    component_id,
                    error = %e,
                    "Stage {} is now promoted automatically",
                    component_id
                );
            }
        }

        Err(err)
    }

    /// Promote an image into a gated stage
    ///
    /// The backend copies `source_tag` from the source repository into the
    /// stage's destination under `destination_tag`, then runs the stages after it.
    ///
    /// # Returns
    /// The updated pipeline
    pub async fn run_manual_promotion(&self, req: PromoteStage) -> Result<Pipeline> {
        self.ajax_post(
            "RunPipelineManualPromotion",
            vec![
                ("pipelineId", req.pipeline_id),
                ("componentId", req.component_id),
                ("sourceRepoId", req.source_repo_id),
                ("sourceTag", req.source_tag),
                ("destinationTag", req.destination_tag),
            ],
        )
        .await
    }
}
