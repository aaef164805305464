//! Stage sequencing
//!
//! A pipeline's component list interleaves visible copy stages with invisible
//! manual promotion gates. A gate always sits right before the stage it
//! governs. [`pair_components`] folds each gate into its stage in one pass,
//! and [`sequence`] threads the source repository through the pairs to
//! produce what the stage list renders. [`locate_stage`] stops at a single
//! stage.

use thiserror::Error;

use crate::domain::component::{CopyToRepository, PipelineComponent};
use crate::domain::repo::RepoMap;

/// Errors produced while sequencing a component list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// The pipeline has no source repository yet
    #[error("Pipeline is not connected to a source repository")]
    NotConnected,

    #[error("Manual promotion gate {gate_id} is not followed by a stage")]
    TrailingGate { gate_id: String },

    #[error("Manual promotion gate {first} is followed by another gate ({second})")]
    ConsecutiveGates { first: String, second: String },

    #[error("Stage {component_id} has no destination repository")]
    MissingDestination { component_id: String },

    /// The destination is unknown to the caller (deleted or not readable)
    #[error("Stage {component_id} targets repository {repo_id}, which is not available")]
    UnknownRepository {
        component_id: String,
        repo_id: String,
    },
}

/// A copy stage together with the gate preceding it, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatedStage<'a> {
    /// Position of the stage in the raw component list
    pub index: usize,
    pub gate: Option<&'a str>,
    pub stage: &'a CopyToRepository,
}

/// A stage ready to be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderableStage<'a> {
    /// Position of the stage in the raw component list
    pub index: usize,
    pub component: &'a CopyToRepository,
    /// Repository feeding this stage
    pub source_repo_id: &'a str,
    /// `false` when a manual promotion gate precedes the stage
    pub is_automatic: bool,
    pub gate_component_id: Option<&'a str>,
}

impl RenderableStage<'_> {
    pub fn destination_repo_id(&self) -> Option<&str> {
        self.component.destination_container_repo_id.as_deref()
    }
}

/// Pair every copy stage with the gate right before it
///
/// Rejects a gate that is last in the list or followed by another gate.
pub fn pair_components(components: &[PipelineComponent]) -> Result<Vec<GatedStage<'_>>, SequenceError> {
    let mut pairs = Vec::with_capacity(components.len());
    let mut iter = components.iter().enumerate();

    while let Some((index, component)) = iter.next() {
        match component {
            PipelineComponent::CopyToRepository(stage) => pairs.push(GatedStage {
                index,
                gate: None,
                stage,
            }),
            PipelineComponent::ManualPromotionGate(gate) => match iter.next() {
                Some((index, PipelineComponent::CopyToRepository(stage))) => {
                    pairs.push(GatedStage {
                        index,
                        gate: Some(gate.id.as_str()),
                        stage,
                    })
                }
                Some((_, PipelineComponent::ManualPromotionGate(next))) => {
                    return Err(SequenceError::ConsecutiveGates {
                        first: gate.id.clone(),
                        second: next.id.clone(),
                    });
                }
                None => {
                    return Err(SequenceError::TrailingGate {
                        gate_id: gate.id.clone(),
                    });
                }
            },
        }
    }

    Ok(pairs)
}

/// Derive the renderable stages of a pipeline
///
/// The first stage is fed by `root_repo_id`; every later stage is fed by the
/// destination repository of the stage before it, resolved through `repos`.
pub fn sequence<'a>(
    components: &'a [PipelineComponent],
    root_repo_id: Option<&'a str>,
    repos: &'a RepoMap,
) -> Result<Vec<RenderableStage<'a>>, SequenceError> {
    let mut source_repo_id = root_repo_id
        .filter(|id| !id.is_empty())
        .ok_or(SequenceError::NotConnected)?;

    let pairs = pair_components(components)?;
    let mut stages = Vec::with_capacity(pairs.len());

    for pair in pairs {
        stages.push(RenderableStage {
            index: pair.index,
            component: pair.stage,
            source_repo_id,
            is_automatic: pair.gate.is_none(),
            gate_component_id: pair.gate,
        });

        source_repo_id = resolve_destination(pair.stage, repos)?;
    }

    Ok(stages)
}

/// Find one stage and the repository feeding it
///
/// Only the stages upstream of `component_id` have their destinations
/// resolved, so a broken stage further down does not hide this one. Returns
/// `None` when no copy stage has that id (ids match case-insensitively).
pub fn locate_stage<'a>(
    components: &'a [PipelineComponent],
    root_repo_id: Option<&'a str>,
    repos: &'a RepoMap,
    component_id: &str,
) -> Result<Option<RenderableStage<'a>>, SequenceError> {
    let mut source_repo_id = root_repo_id
        .filter(|id| !id.is_empty())
        .ok_or(SequenceError::NotConnected)?;

    for pair in pair_components(components)? {
        if pair.stage.id.eq_ignore_ascii_case(component_id) {
            return Ok(Some(RenderableStage {
                index: pair.index,
                component: pair.stage,
                source_repo_id,
                is_automatic: pair.gate.is_none(),
                gate_component_id: pair.gate,
            }));
        }
        source_repo_id = resolve_destination(pair.stage, repos)?;
    }

    Ok(None)
}

fn resolve_destination<'a>(
    stage: &CopyToRepository,
    repos: &'a RepoMap,
) -> Result<&'a str, SequenceError> {
    let destination = stage
        .destination_container_repo_id
        .as_deref()
        .ok_or_else(|| SequenceError::MissingDestination {
            component_id: stage.id.clone(),
        })?;
    repos
        .get(destination)
        .map(|repo| repo.id.as_str())
        .ok_or_else(|| SequenceError::UnknownRepository {
            component_id: stage.id.clone(),
            repo_id: destination.to_string(),
        })
}

/// Backend call that flips a stage between automatic and manual promotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateToggle {
    /// Insert a manual promotion gate right before the stage
    AddGateBefore { component_id: String },
    /// Remove the gate that currently precedes the stage
    RemoveGate { gate_id: String },
}

/// Work out how to toggle manual promotion for `component_id`
///
/// Returns `None` when the component is not part of the list.
pub fn plan_gate_toggle(components: &[PipelineComponent], component_id: &str) -> Option<GateToggle> {
    let index = components.iter().position(|c| c.id() == component_id)?;

    let previous = index.checked_sub(1).map(|i| &components[i]);
    match previous {
        Some(PipelineComponent::ManualPromotionGate(gate)) => Some(GateToggle::RemoveGate {
            gate_id: gate.id.clone(),
        }),
        _ => Some(GateToggle::AddGateBefore {
            component_id: components[index].id().to_string(),
        }),
    }
}
