//! Pipeline command handlers
//!
//! Handles pipeline management, stage editing, manual promotion and the
//! `watch` loop that keeps a pipeline's stage list on screen.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::DateTime;
use clap::Subcommand;
use colored::*;
use europa_core::domain::component::PipelineComponent;
use europa_core::domain::pipeline::Pipeline;
use europa_core::domain::repo::RepoMap;
use europa_core::dto::pipeline::{
    AddComponent, CreatePipeline, MoveComponent, NewComponent, NewStage, RemoveComponent,
    SetContainerRepo,
};
use europa_core::promotion::{PromotionPhase, UNKNOWN_IMAGE_SHA};
use europa_core::stages::{GateToggle, RenderableStage, plan_gate_toggle, sequence};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use super::repo::print_event;
use crate::config::{Config, EVENT_POLL_INTERVAL};
use crate::id_resolver::{match_repo, resolve_pipeline};
use europa_client::{ConsoleClient, PromotionSession};

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// List all pipelines
    List {
        /// Only show pipelines whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Show a pipeline and its stages
    Show {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
    },
    /// Create a new pipeline
    Create {
        /// Pipeline name
        name: String,
    },
    /// Delete a pipeline
    Remove {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
    },
    /// Connect the repository feeding the first stage
    Connect {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Repository ID or name
        repo: String,
    },
    /// Disconnect the source repository
    Disconnect {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
    },
    /// Add a stage copying images into a repository
    AddStage {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Destination repository ID or name
        repo: String,
        /// Tag to apply in the destination
        #[arg(short, long)]
        tag: Option<String>,
        /// Insert before this component instead of at the end
        #[arg(short, long)]
        before: Option<String>,
    },
    /// Remove a stage and its manual promotion gate
    RemoveStage {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Stage component ID
        component: String,
    },
    /// Move a stage to another position in the component list
    MoveStage {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Stage component ID
        component: String,
        /// Target position in the component list
        index: usize,
    },
    /// Switch a stage between automatic and manual promotion
    ToggleGate {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Stage component ID
        component: String,
    },
    /// Promote an image into a stage
    Promote {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
        /// Stage component ID
        component: String,
        /// Source event ID or image digest (defaults to the newest pushed image)
        #[arg(short, long)]
        event: Option<String>,
        /// Destination tag (defaults to the first tag of the source image)
        #[arg(short, long)]
        tag: Option<String>,
        /// Only consider source images with a tag containing this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Wait for a pushed image if the source repository has none yet
        #[arg(long)]
        wait: bool,
    },
    /// Keep refreshing a pipeline's stages
    Watch {
        /// Pipeline ID, unambiguous prefix or name
        pipeline: String,
    },
}

/// Handle pipeline commands
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = ConsoleClient::new(&config.console_url);

    match command {
        PipelineCommands::List { filter } => list_pipelines(&client, filter.as_deref()).await,
        PipelineCommands::Show { pipeline } => show_pipeline(&client, &pipeline).await,
        PipelineCommands::Create { name } => create_pipeline(&client, name).await,
        PipelineCommands::Remove { pipeline } => remove_pipeline(&client, &pipeline).await,
        PipelineCommands::Connect { pipeline, repo } => {
            connect_repo(&client, &pipeline, &repo).await
        }
        PipelineCommands::Disconnect { pipeline } => disconnect_repo(&client, &pipeline).await,
        PipelineCommands::AddStage {
            pipeline,
            repo,
            tag,
            before,
        } => add_stage(&client, &pipeline, &repo, tag, before).await,
        PipelineCommands::RemoveStage {
            pipeline,
            component,
        } => remove_stage(&client, &pipeline, &component).await,
        PipelineCommands::MoveStage {
            pipeline,
            component,
            index,
        } => move_stage(&client, &pipeline, &component, index).await,
        PipelineCommands::ToggleGate {
            pipeline,
            component,
        } => toggle_gate(&client, &pipeline, &component).await,
        PipelineCommands::Promote {
            pipeline,
            component,
            event,
            tag,
            filter,
            wait,
        } => {
            let options = PromoteOptions {
                event,
                tag,
                filter,
                wait,
            };
            promote(Arc::new(client), &pipeline, &component, options).await
        }
        PipelineCommands::Watch { pipeline } => watch_pipeline(&client, &pipeline, config).await,
    }
}

// =============================================================================
// Pipeline Management
// =============================================================================

async fn list_pipelines(client: &ConsoleClient, filter: Option<&str>) -> Result<()> {
    let filter = filter.map(str::to_lowercase);
    let pipelines: Vec<_> = client
        .list_pipelines()
        .await?
        .into_iter()
        .filter(|p| {
            filter
                .as_deref()
                .is_none_or(|f| p.name.to_lowercase().contains(f))
        })
        .collect();

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in &pipelines {
            print_pipeline_summary(pipeline);
        }
    }

    Ok(())
}

async fn show_pipeline(client: &ConsoleClient, reference: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let repos = fetch_repos(client).await?;

    print_pipeline_details(&pipeline, &repos);

    Ok(())
}

async fn create_pipeline(client: &ConsoleClient, name: String) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Pipeline name cannot be empty");
    }

    let pipeline = client.create_pipeline(CreatePipeline { name }).await?;

    println!("{}", "✓ Pipeline created successfully!".green().bold());
    println!("  ID:   {}", pipeline.id.cyan());
    println!("  Name: {}", pipeline.name.bold());
    println!(
        "  Next: {}",
        format!("europa pipeline connect {} <repo>", pipeline.name).dimmed()
    );

    Ok(())
}

async fn remove_pipeline(client: &ConsoleClient, reference: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;

    client.remove_pipeline(&pipeline.id).await?;

    println!(
        "{}",
        format!("✓ Pipeline {} deleted successfully!", pipeline.name)
            .green()
            .bold()
    );

    Ok(())
}

async fn connect_repo(client: &ConsoleClient, reference: &str, repo: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let repos = fetch_repos(client).await?;
    let repo = match_repo(&repos, repo)?;

    let updated = client
        .set_container_repo(SetContainerRepo {
            pipeline_id: pipeline.id.clone(),
            container_repo_id: repo.id.clone(),
        })
        .await
        .context("Failed to connect repository")?;

    println!(
        "{}",
        format!("✓ {} now feeds {}", repo.name, updated.name)
            .green()
            .bold()
    );

    Ok(())
}

async fn disconnect_repo(client: &ConsoleClient, reference: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;

    let updated = client
        .delete_container_repo(&pipeline.id)
        .await
        .context("Failed to disconnect repository")?;

    println!(
        "{}",
        format!("✓ {} is no longer connected", updated.name)
            .green()
            .bold()
    );

    Ok(())
}

// =============================================================================
// Stages
// =============================================================================

async fn add_stage(
    client: &ConsoleClient,
    reference: &str,
    repo: &str,
    tag: Option<String>,
    before: Option<String>,
) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let repos = fetch_repos(client).await?;
    let repo = match_repo(&repos, repo)?;

    let before_component_id = before
        .map(|id| canonical_component_id(&pipeline, &id))
        .transpose()?;

    let updated = client
        .add_component(AddComponent {
            pipeline_id: pipeline.id.clone(),
            component: NewComponent::CopyToRepository(NewStage {
                destination_container_repo_domain: repo.domain.clone(),
                destination_container_repo_id: Some(repo.id.clone()),
                tag,
            }),
            before_component_id,
        })
        .await
        .context("Failed to add stage")?;

    println!(
        "{}",
        format!("✓ Added stage copying into {}", repo.name)
            .green()
            .bold()
    );
    print_stages(&updated, &repos);

    Ok(())
}

async fn remove_stage(client: &ConsoleClient, reference: &str, component: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let component_id = canonical_stage_id(&pipeline, component)?;

    let updated = client
        .remove_stage(&pipeline, &component_id)
        .await
        .context("Failed to remove stage")?;

    println!(
        "{}",
        format!("✓ Removed stage {}", component_id).green().bold()
    );
    let repos = fetch_repos(client).await?;
    print_stages(&updated, &repos);

    Ok(())
}

async fn move_stage(
    client: &ConsoleClient,
    reference: &str,
    component: &str,
    target_index: usize,
) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let component_id = canonical_stage_id(&pipeline, component)?;

    if target_index >= pipeline.components.len() {
        bail!(
            "Target index {} is out of range (pipeline has {} components)",
            target_index,
            pipeline.components.len()
        );
    }
    if let Some(GateToggle::RemoveGate { .. }) =
        plan_gate_toggle(&pipeline.components, &component_id)
    {
        bail!(
            "Stage {} requires manual promotion; toggle its gate off before moving it",
            component_id
        );
    }

    let updated = client
        .move_component(MoveComponent {
            pipeline_id: pipeline.id.clone(),
            pipeline_component_id: component_id.clone(),
            target_index,
        })
        .await
        .context("Failed to move stage")?;

    println!(
        "{}",
        format!("✓ Moved stage {} to position {}", component_id, target_index)
            .green()
            .bold()
    );
    let repos = fetch_repos(client).await?;
    print_stages(&updated, &repos);

    Ok(())
}

async fn toggle_gate(client: &ConsoleClient, reference: &str, component: &str) -> Result<()> {
    let pipeline = resolve_pipeline(client, reference).await?;
    let component_id = canonical_stage_id(&pipeline, component)?;

    let toggle = plan_gate_toggle(&pipeline.components, &component_id)
        .ok_or_else(|| anyhow!("Component {} not found in {}", component_id, pipeline.name))?;

    let (updated, message) = match toggle {
        GateToggle::AddGateBefore { component_id } => {
            let updated = client
                .add_component(AddComponent {
                    pipeline_id: pipeline.id.clone(),
                    component: NewComponent::ManualPromotionGate,
                    before_component_id: Some(component_id.clone()),
                })
                .await
                .context("Failed to add manual promotion gate")?;
            (updated, format!("✓ Stage {} now requires manual promotion", component_id))
        }
        GateToggle::RemoveGate { gate_id } => {
            let updated = client
                .remove_component(RemoveComponent {
                    pipeline_id: pipeline.id.clone(),
                    pipeline_component_id: gate_id,
                })
                .await
                .context("Failed to remove manual promotion gate")?;
            (updated, format!("✓ Stage {} now promotes automatically", component_id))
        }
    };

    println!("{}", message.green().bold());
    let repos = fetch_repos(client).await?;
    print_stages(&updated, &repos);

    Ok(())
}

// =============================================================================
// Promotion
// =============================================================================

struct PromoteOptions {
    event: Option<String>,
    tag: Option<String>,
    filter: Option<String>,
    wait: bool,
}

async fn promote(
    client: Arc<ConsoleClient>,
    reference: &str,
    component: &str,
    options: PromoteOptions,
) -> Result<()> {
    let pipeline = resolve_pipeline(&client, reference).await?;
    let repos = fetch_repos(&client).await?;

    let mut session = PromotionSession::open(client.clone(), pipeline, repos, component).await?;
    if let Some(filter) = options.filter {
        session.set_event_filter(filter);
    }

    let destination = session
        .workflow()
        .destination_summary(session.repos())?;
    let source = session
        .workflow()
        .source_repo_id()
        .and_then(|id| session.repos().get(id))
        .map(|repo| repo.name.clone())
        .unwrap_or_default();
    let current_tags = if destination.image_tags.is_empty() {
        "<none>".to_string()
    } else {
        destination.image_tags.join(", ")
    };
    let current_sha = if destination.image_sha == UNKNOWN_IMAGE_SHA {
        ""
    } else {
        destination.image_sha.as_str()
    };

    println!("{}", "Promote Image:".bold());
    println!("  From:    {}", source.cyan());
    println!("  To:      {}", destination.repo_name.cyan());
    println!("  Current: {} {}", current_tags.dimmed(), current_sha.dimmed());

    while let Some(e) = session.workflow().error() {
        if !options.wait {
            bail!("{}", e);
        }
        info!("Retrying in {:?}", EVENT_POLL_INTERVAL);
        tokio::time::sleep(EVENT_POLL_INTERVAL).await;
        // Failures are logged by the session and stay on the workflow
        let _ = session.load_events().await;
    }

    match options.event {
        Some(event_id) => session.select_event_by_id(&event_id)?,
        None => {
            while !session.select_latest_event()? {
                if !options.wait {
                    bail!("No pushed images found in {}", source);
                }
                info!("Waiting for an image to be pushed to {}", source);
                tokio::time::sleep(EVENT_POLL_INTERVAL).await;
                if let Err(e) = session.load_events().await {
                    warn!("Failed to refresh events: {}", e);
                }
            }
        }
    }

    if let Some(event) = session.workflow().source_event() {
        println!("  Image:");
        print_event(event);
    }

    if let Some(tag) = options.tag {
        session.set_destination_tag(tag)?;
    }

    let workflow = session.workflow();
    if workflow.is_tag_invalid() {
        bail!(
            "The destination tag '{}' is not valid",
            workflow.destination_tag().unwrap_or_default()
        );
    }
    if workflow.phase() != PromotionPhase::Ready {
        bail!("The selected image has no tag; pass one with --tag");
    }

    let destination_tag = workflow.destination_tag().unwrap_or_default().to_string();
    let updated = session.confirm().await?;

    println!(
        "{}",
        format!(
            "✓ Promoted to {}:{}",
            destination.repo_name, destination_tag
        )
        .green()
        .bold()
    );
    print_stages(&updated, session.repos());

    Ok(())
}

// =============================================================================
// Watch
// =============================================================================

async fn watch_pipeline(client: &ConsoleClient, reference: &str, config: &Config) -> Result<()> {
    let pipeline_id = resolve_pipeline(client, reference).await?.id;

    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Watching pipeline {} every {:?} (Ctrl+C to stop)",
        pipeline_id, config.poll_interval
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresh(client, &pipeline_id).await {
                    Ok((pipeline, repos)) => {
                        println!(
                            "\n{}",
                            chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
                        );
                        print_pipeline_details(&pipeline, &repos);
                    }
                    Err(e) => warn!("Failed to refresh pipeline {}: {:#}", pipeline_id, e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped watching {}", pipeline_id);
                return Ok(());
            }
        }
    }
}

async fn refresh(client: &ConsoleClient, pipeline_id: &str) -> Result<(Pipeline, RepoMap)> {
    let repos = fetch_repos(client).await?;
    let pipeline = client
        .get_pipeline(pipeline_id)
        .await
        .context("Failed to fetch pipeline")?;
    Ok((pipeline, repos))
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_repos(client: &ConsoleClient) -> Result<RepoMap> {
    let repos = client
        .list_repos()
        .await
        .context("Failed to fetch repositories")?;
    Ok(repos.into())
}

/// The component's id as stored, matched case-insensitively
fn canonical_component_id(pipeline: &Pipeline, component: &str) -> Result<String> {
    pipeline
        .component(component)
        .map(|c| c.id().to_string())
        .ok_or_else(|| anyhow!("Component {} not found in {}", component, pipeline.name))
}

/// Like [`canonical_component_id`], rejecting manual promotion gates
fn canonical_stage_id(pipeline: &Pipeline, component: &str) -> Result<String> {
    match pipeline.component(component) {
        Some(PipelineComponent::CopyToRepository(stage)) => Ok(stage.id.clone()),
        Some(PipelineComponent::ManualPromotionGate(gate)) => Err(anyhow!(
            "Component {} is a manual promotion gate; name the stage after it instead",
            gate.id
        )),
        None => Err(anyhow!(
            "Component {} not found in {}",
            component,
            pipeline.name
        )),
    }
}

fn repo_name<'a>(repos: &'a RepoMap, repo_id: &'a str) -> &'a str {
    repos.get(repo_id).map(|r| r.name.as_str()).unwrap_or(repo_id)
}

fn print_pipeline_summary(pipeline: &Pipeline) {
    let stages = pipeline
        .components
        .iter()
        .filter(|c| c.kind().is_visible())
        .count();
    println!("  {} {}", "▸".cyan(), pipeline.name.bold());
    println!("    ID:     {}", pipeline.id.dimmed());
    println!("    Stages: {}", stages.to_string().dimmed());
    if !pipeline.is_connected() {
        println!("    {}", "Not connected".yellow());
    }
    println!();
}

fn print_pipeline_details(pipeline: &Pipeline, repos: &RepoMap) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:     {}", pipeline.id.cyan());
    println!("  Name:   {}", pipeline.name.bold());
    match pipeline.container_repo_id.as_deref() {
        Some(repo_id) if pipeline.is_connected() => {
            println!("  Source: {}", repo_name(repos, repo_id));
        }
        _ => println!("  Source: {}", "not connected".yellow()),
    }

    println!("\n{}", "Stages:".bold());
    print_stages(pipeline, repos);
}

fn print_stages(pipeline: &Pipeline, repos: &RepoMap) {
    match sequence(
        &pipeline.components,
        pipeline.container_repo_id.as_deref(),
        repos,
    ) {
        Ok(stages) if stages.is_empty() => println!("  {}", "No stages yet.".dimmed()),
        Ok(stages) => {
            for (position, stage) in stages.iter().enumerate() {
                print_stage(position + 1, stage, repos);
            }
        }
        Err(e) => println!("  {}", e.to_string().red()),
    }
}

fn print_stage(position: usize, stage: &RenderableStage<'_>, repos: &RepoMap) {
    let destination = stage
        .destination_repo_id()
        .map(|id| repo_name(repos, id))
        .unwrap_or("-");
    let mode = if stage.is_automatic {
        "auto".green()
    } else {
        "manual".yellow()
    };

    println!(
        "  {}. {} {} → {} [{}]",
        position,
        stage.component.id.dimmed(),
        repo_name(repos, stage.source_repo_id),
        destination.bold(),
        mode
    );
    if let Some(tag) = &stage.component.tag {
        println!("     Tag:      {}", tag.cyan());
    }
    if let Some(status) = &stage.component.last_execution_status {
        let when = stage
            .component
            .last_execution_time
            .and_then(DateTime::from_timestamp_millis)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("     Last run: {} {}", status, when.dimmed());
    }
}
