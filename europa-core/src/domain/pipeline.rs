//! Pipeline domain types

use serde::{Deserialize, Serialize};

use crate::domain::component::{CopyToRepository, PipelineComponent};

/// Pipeline definition
///
/// Served by the backend after every mutation; callers replace their local
/// copy wholesale instead of patching the component list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Source repository feeding the first stage
    #[serde(default)]
    pub container_repo_id: Option<String>,
    #[serde(default)]
    pub components: Vec<PipelineComponent>,
}

impl Pipeline {
    /// Whether a source repository has been connected
    pub fn is_connected(&self) -> bool {
        self.container_repo_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }

    /// Position of a component, matching ids case-insensitively
    pub fn component_index(&self, component_id: &str) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.id().eq_ignore_ascii_case(component_id))
    }

    pub fn component(&self, component_id: &str) -> Option<&PipelineComponent> {
        self.component_index(component_id)
            .map(|index| &self.components[index])
    }

    /// Look up a copy stage by id; gates never match
    pub fn copy_stage(&self, component_id: &str) -> Option<&CopyToRepository> {
        self.component(component_id)
            .and_then(PipelineComponent::as_copy_stage)
    }
}
