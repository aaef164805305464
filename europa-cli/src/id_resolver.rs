//! Reference resolver module
//!
//! Lets users name pipelines and repositories the short way: a pipeline by
//! id, unambiguous id prefix or exact name; a repository by id or exact name.

use anyhow::{Context, Result, anyhow, bail};
use europa_client::ConsoleClient;
use europa_core::domain::pipeline::Pipeline;
use europa_core::domain::repo::{Repo, RepoMap};

/// Resolve a pipeline reference by querying the console
pub async fn resolve_pipeline(client: &ConsoleClient, reference: &str) -> Result<Pipeline> {
    let pipelines = client
        .list_pipelines()
        .await
        .context("Failed to fetch pipelines for ID resolution")?;

    match_pipeline(&pipelines, reference).cloned()
}

/// Find the pipeline a reference designates
///
/// An exact id wins over an exact name, which wins over an id prefix. Ids are
/// compared case-insensitively.
pub fn match_pipeline<'a>(pipelines: &'a [Pipeline], reference: &str) -> Result<&'a Pipeline> {
    if reference.is_empty() {
        bail!("Pipeline reference cannot be empty");
    }

    if let Some(pipeline) = pipelines
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(reference))
    {
        return Ok(pipeline);
    }
    if let Some(pipeline) = pipelines.iter().find(|p| p.name == reference) {
        return Ok(pipeline);
    }

    let prefix = reference.to_lowercase();
    let matches: Vec<_> = pipelines
        .iter()
        .filter(|p| p.id.to_lowercase().starts_with(&prefix))
        .collect();

    match matches.len() {
        0 => Err(anyhow!(
            "No pipeline found with ID or name matching '{}'",
            reference
        )),
        1 => Ok(matches[0]),
        _ => {
            let ids: Vec<&str> = matches.iter().map(|p| p.id.as_str()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple pipelines: {}",
                reference,
                ids.join(", ")
            ))
        }
    }
}

/// Find a repository by id or exact name
pub fn match_repo<'a>(repos: &'a RepoMap, reference: &str) -> Result<&'a Repo> {
    repos
        .get(reference)
        .or_else(|| repos.find_by_name(reference))
        .ok_or_else(|| anyhow!("No repository found with ID or name '{}'", reference))
}
