//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::component::ComponentKind;

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub name: String,
}

/// Request to connect (or reconnect) a pipeline's source repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetContainerRepo {
    pub pipeline_id: String,
    pub container_repo_id: String,
}

/// Component to insert into a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewComponent {
    CopyToRepository(NewStage),
    ManualPromotionGate,
}

/// Properties of a new copy stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    pub destination_container_repo_domain: Option<String>,
    pub destination_container_repo_id: Option<String>,
    pub tag: Option<String>,
}

impl NewComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            NewComponent::CopyToRepository(_) => ComponentKind::CopyToRepository,
            NewComponent::ManualPromotionGate => ComponentKind::ManualPromotionGate,
        }
    }

    /// JSON content sent as the request body
    pub fn content(&self) -> Value {
        match self {
            NewComponent::CopyToRepository(stage) => json!(stage),
            NewComponent::ManualPromotionGate => json!({}),
        }
    }
}

/// Request to insert a component, before another one or at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddComponent {
    pub pipeline_id: String,
    pub component: NewComponent,
    pub before_component_id: Option<String>,
}

/// Request to move a component to a new position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveComponent {
    pub pipeline_id: String,
    pub pipeline_component_id: String,
    pub target_index: usize,
}

/// Request to remove a component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveComponent {
    pub pipeline_id: String,
    pub pipeline_component_id: String,
}

/// Manual promotion of an image into a gated stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteStage {
    pub pipeline_id: String,
    pub component_id: String,
    pub source_repo_id: String,
    pub source_tag: String,
    pub destination_tag: String,
}
