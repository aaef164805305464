//! Pipeline component domain types
//!
//! The backend serializes components without a type field; the kind is
//! inferred from which properties are present. Records are classified once at
//! deserialization and carried around as [`PipelineComponent`] afterwards.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties whose presence marks a record as a copy stage
pub const COPY_TO_REPOSITORY_PROPERTIES: [&str; 3] = [
    "destinationContainerRepoDomain",
    "destinationContainerRepoId",
    "tag",
];

/// Kind of a pipeline component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Copies an image into a destination repository
    CopyToRepository,

    /// Marks the following stage as requiring a manual promotion
    ManualPromotionGate,
}

impl ComponentKind {
    /// Whether components of this kind are rendered as their own stage
    pub fn is_visible(&self) -> bool {
        matches!(self, ComponentKind::CopyToRepository)
    }

    /// Type name understood by the backend's `AddPipelineComponent` operation
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::CopyToRepository => "CopyToRepository",
            ComponentKind::ManualPromotionGate => "ManualPromotionGate",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw component record
///
/// A record is a `CopyToRepository` stage if it carries any of
/// [`COPY_TO_REPOSITORY_PROPERTIES`], whatever the value (`null` included).
/// Everything else is a `ManualPromotionGate`.
pub fn classify(raw: &Map<String, Value>) -> ComponentKind {
    if COPY_TO_REPOSITORY_PROPERTIES
        .iter()
        .any(|property| raw.contains_key(*property))
    {
        ComponentKind::CopyToRepository
    } else {
        ComponentKind::ManualPromotionGate
    }
}

/// Pipeline stage that copies an image to a destination repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyToRepository {
    pub id: String,
    pub destination_container_repo_domain: Option<String>,
    pub destination_container_repo_id: Option<String>,
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution_status: Option<String>,
}

impl CopyToRepository {
    /// Create a stage targeting `destination_repo_id`
    pub fn new(id: impl Into<String>, destination_repo_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination_container_repo_domain: None,
            destination_container_repo_id: Some(destination_repo_id.into()),
            tag: None,
            last_execution_time: None,
            last_execution_status: None,
        }
    }
}

/// Invisible marker governing the stage right after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualPromotionGate {
    pub id: String,
}

impl ManualPromotionGate {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A component of a pipeline, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PipelineComponent {
    CopyToRepository(CopyToRepository),
    ManualPromotionGate(ManualPromotionGate),
}

impl PipelineComponent {
    pub fn id(&self) -> &str {
        match self {
            PipelineComponent::CopyToRepository(stage) => &stage.id,
            PipelineComponent::ManualPromotionGate(gate) => &gate.id,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            PipelineComponent::CopyToRepository(_) => ComponentKind::CopyToRepository,
            PipelineComponent::ManualPromotionGate(_) => ComponentKind::ManualPromotionGate,
        }
    }

    /// The copy stage, if this component is one
    pub fn as_copy_stage(&self) -> Option<&CopyToRepository> {
        match self {
            PipelineComponent::CopyToRepository(stage) => Some(stage),
            PipelineComponent::ManualPromotionGate(_) => None,
        }
    }

    /// Build a component from its raw wire record
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, String> {
        let id = string_field(raw, "id")
            .ok_or_else(|| "pipeline component is missing an id".to_string())?;

        let component = match classify(raw) {
            ComponentKind::CopyToRepository => {
                PipelineComponent::CopyToRepository(CopyToRepository {
                    id,
                    destination_container_repo_domain: string_field(
                        raw,
                        "destinationContainerRepoDomain",
                    ),
                    destination_container_repo_id: string_field(raw, "destinationContainerRepoId"),
                    tag: string_field(raw, "tag"),
                    last_execution_time: raw.get("lastExecutionTime").and_then(Value::as_i64),
                    last_execution_status: string_field(raw, "lastExecutionStatus"),
                })
            }
            ComponentKind::ManualPromotionGate => {
                PipelineComponent::ManualPromotionGate(ManualPromotionGate { id })
            }
        };

        Ok(component)
    }
}

impl From<CopyToRepository> for PipelineComponent {
    fn from(stage: CopyToRepository) -> Self {
        PipelineComponent::CopyToRepository(stage)
    }
}

impl From<ManualPromotionGate> for PipelineComponent {
    fn from(gate: ManualPromotionGate) -> Self {
        PipelineComponent::ManualPromotionGate(gate)
    }
}

impl<'de> Deserialize<'de> for PipelineComponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        PipelineComponent::from_raw(&raw).map_err(de::Error::custom)
    }
}

/// Read a scalar property as a string; `null` and booleans read as absent
fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
