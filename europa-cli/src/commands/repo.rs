//! Repository command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use europa_core::domain::event::{EventType, RepoEvent};
use europa_core::domain::manifest::RepoManifest;
use europa_core::domain::repo::{Repo, RepoMap};
use europa_core::dto::repo::{CreateLocalRepo, CreateRepoMirror, ListRepoEvents, ListRepoManifests};

use crate::config::Config;
use crate::id_resolver::match_repo;
use europa_client::ConsoleClient;

/// Repository subcommands
#[derive(Subcommand)]
pub enum RepoCommands {
    /// List the repositories you can see
    List,
    /// List recent events of a repository
    Events {
        /// Repository ID or name
        repo: String,

        /// Only show events with a tag containing this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Pagination marker from a previous listing
        #[arg(short, long)]
        marker: Option<String>,

        /// Page towards newer events
        #[arg(long)]
        backward: bool,
    },
    /// Show one repository
    Show {
        /// Repository ID or name
        repo: String,
    },
    /// List the image manifests stored in a repository
    Manifests {
        /// Repository ID or name
        repo: String,

        /// Pagination marker from a previous listing
        #[arg(short, long)]
        marker: Option<String>,

        /// Page towards newer manifests
        #[arg(long)]
        backward: bool,
    },
    /// Create a repository hosted by the console
    Create {
        /// Repository name
        name: String,
    },
    /// Create a local repository mirroring another one
    Mirror {
        /// Repository to mirror (ID or name)
        source: String,
        /// Name of the new mirror
        name: String,
    },
    /// Delete a repository
    Delete {
        /// Repository ID or name
        repo: String,
    },
}

pub async fn handle_repo_command(command: RepoCommands, config: &Config) -> Result<()> {
    let client = ConsoleClient::new(&config.console_url);

    match command {
        RepoCommands::List => list_repos(&client).await,
        RepoCommands::Events {
            repo,
            filter,
            marker,
            backward,
        } => list_events(&client, &repo, filter.as_deref(), marker, backward).await,
        RepoCommands::Show { repo } => show_repo(&client, &repo).await,
        RepoCommands::Manifests {
            repo,
            marker,
            backward,
        } => list_manifests(&client, &repo, marker, backward).await,
        RepoCommands::Create { name } => create_repo(&client, name).await,
        RepoCommands::Mirror { source, name } => mirror_repo(&client, &source, name).await,
        RepoCommands::Delete { repo } => delete_repo(&client, &repo).await,
    }
}

async fn fetch_repos(client: &ConsoleClient) -> Result<RepoMap> {
    Ok(client
        .list_repos()
        .await
        .context("Failed to fetch repositories")?
        .into())
}

async fn list_repos(client: &ConsoleClient) -> Result<()> {
    let mut repos = client.list_repos().await?;

    if repos.is_empty() {
        println!("{}", "No repositories found.".yellow());
        return Ok(());
    }

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    println!("{}", format!("Found {} repository(ies):", repos.len()).bold());
    println!();
    for repo in &repos {
        print_repo_summary(repo);
    }

    Ok(())
}

async fn list_events(
    client: &ConsoleClient,
    reference: &str,
    filter: Option<&str>,
    marker: Option<String>,
    backward: bool,
) -> Result<()> {
    let repos = fetch_repos(client).await?;
    let repo = match_repo(&repos, reference)?;

    let page = client
        .list_repo_events(ListRepoEvents {
            repo_id: repo.id.clone(),
            marker,
            backward,
        })
        .await
        .with_context(|| format!("Failed to list events of {}", repo.name))?;

    let filter = filter.unwrap_or_default();
    let events: Vec<_> = page
        .events
        .iter()
        .filter(|event| event.matches_tag(filter))
        .collect();

    println!("{}", format!("Events of {}:", repo.name).bold());
    if events.is_empty() {
        println!("  {}", "No events found.".yellow());
    }
    for event in events {
        print_event(event);
    }

    if let Some(prev) = &page.prev_marker {
        println!("\n  Newer: --marker {} --backward", prev.cyan());
    }
    if let Some(next) = &page.next_marker {
        println!("  Older: --marker {}", next.cyan());
    }

    Ok(())
}

async fn show_repo(client: &ConsoleClient, reference: &str) -> Result<()> {
    let repos = fetch_repos(client).await?;
    let id = match_repo(&repos, reference)?.id.clone();

    let repo = client
        .get_repo(&id)
        .await
        .with_context(|| format!("Failed to get repository {}", id))?;
    print_repo_summary(&repo);

    Ok(())
}

async fn list_manifests(
    client: &ConsoleClient,
    reference: &str,
    marker: Option<String>,
    backward: bool,
) -> Result<()> {
    let repos = fetch_repos(client).await?;
    let repo = match_repo(&repos, reference)?;

    let page = client
        .list_repo_manifests(ListRepoManifests {
            repo_id: repo.id.clone(),
            marker,
            backward,
        })
        .await
        .with_context(|| format!("Failed to list manifests of {}", repo.name))?;

    println!("{}", format!("Images in {}:", repo.name).bold());
    if page.manifests.is_empty() {
        println!("  {}", "No images found.".yellow());
    }
    let mut manifests = page.manifests;
    manifests.sort_by(|a, b| b.push_time.cmp(&a.push_time));
    for manifest in &manifests {
        print_manifest(manifest);
    }

    if let Some(prev) = &page.prev_marker {
        println!("\n  Newer: --marker {} --backward", prev.cyan());
    }
    if let Some(next) = &page.next_marker {
        println!("  Older: --marker {}", next.cyan());
    }

    Ok(())
}

async fn create_repo(client: &ConsoleClient, name: String) -> Result<()> {
    let repo = client
        .create_local_repo(CreateLocalRepo { repo_name: name })
        .await
        .context("There was an error creating your repository")?;

    println!(
        "{}",
        format!("✓ Created repository {}", repo.name).green().bold()
    );
    print_repo_summary(&repo);

    Ok(())
}

async fn mirror_repo(client: &ConsoleClient, source: &str, name: String) -> Result<()> {
    let repos = fetch_repos(client).await?;
    let source = match_repo(&repos, source)?;

    let repo = client
        .create_repo_mirror(CreateRepoMirror {
            repo_name: name,
            source_repo_id: source.id.clone(),
        })
        .await
        .context("There was an error creating your repository")?;

    println!(
        "{}",
        format!("✓ {} now mirrors {}", repo.name, source.name)
            .green()
            .bold()
    );

    Ok(())
}

async fn delete_repo(client: &ConsoleClient, reference: &str) -> Result<()> {
    let repos = fetch_repos(client).await?;
    let repo = match_repo(&repos, reference)?;

    client
        .delete_repo(&repo.id)
        .await
        .with_context(|| format!("Failed to delete repository {}", repo.name))?;

    println!(
        "{}",
        format!("✓ Deleted repository {}", repo.name).green().bold()
    );

    Ok(())
}

fn print_repo_summary(repo: &Repo) {
    let provider = repo
        .provider
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    println!("  {} {}", "▸".cyan(), repo.name.bold());
    println!("    ID:       {}", repo.id.dimmed());
    println!("    Provider: {}", provider.dimmed());
    if repo.mirror {
        println!("    Mirror:   {}", "yes".dimmed());
    }
    if let Some(event) = &repo.last_event {
        println!(
            "    Last:     {} {}",
            event.event_type.to_string().dimmed(),
            event.image_tags.join(", ").dimmed()
        );
    }
    println!();
}

/// Print one event line
pub fn print_event(event: &RepoEvent) {
    let time = event
        .event_time_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let kind = match event.event_type {
        EventType::Push => event.event_type.to_string().green(),
        EventType::Pull => event.event_type.to_string().blue(),
        _ => event.event_type.to_string().dimmed(),
    };
    let tags = if event.image_tags.is_empty() {
        "<untagged>".to_string()
    } else {
        event.image_tags.join(", ")
    };

    println!(
        "  {} {:<5} {} {} {}",
        time.dimmed(),
        kind,
        event.id.cyan(),
        tags.bold(),
        event.image_sha.as_deref().unwrap_or("").dimmed()
    );
}

fn print_manifest(manifest: &RepoManifest) {
    let time = manifest
        .push_time_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let tags = if manifest.tags.is_empty() {
        "<untagged>".to_string()
    } else {
        manifest.tags.join(", ")
    };
    let size = manifest
        .virtual_size
        .map(format_size)
        .unwrap_or_default();

    println!(
        "  {} {} {} {}",
        time.dimmed(),
        tags.bold(),
        manifest.manifest_id.cyan(),
        size.dimmed()
    );
}

/// Human-readable image size
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
