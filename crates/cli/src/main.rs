use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use content::{has_outstanding_jobs, ContentId, ContentItem, ContentStatus, ContentType, UserContext};
use generation::{CatalystConfig, ContentService, GenerationRequest, RefreshMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "catalyst")]
#[command(about = "Content Catalyst CLI - generate, review and schedule social posts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or replace the notes and links headlines are drawn from
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Manage the reference image library
    Images {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Generate a batch of posts
    Generate {
        /// Content type (text, image, video)
        #[arg(short = 't', long = "type", default_value = "text")]
        kind: ContentType,

        /// Number of posts
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,

        /// Notes to use instead of the stored context
        #[arg(long)]
        notes: Option<String>,

        /// Links to use instead of the stored context
        #[arg(long)]
        links: Option<String>,

        /// Library image to start image/video generation from
        #[arg(long)]
        image: Option<String>,
    },

    /// List content, newest first
    List {
        /// Keep refreshing until nothing is generating
        #[arg(short, long)]
        watch: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Set the status of a post
    Status {
        id: String,

        /// pending, approved, rejected, posted, generating, error (use `schedule` to schedule)
        status: ContentStatus,
    },

    /// Schedule a post (RFC 3339 timestamp)
    Schedule { id: String, at: DateTime<Utc> },

    /// Delete a post
    Delete { id: String },
}

#[derive(Subcommand)]
enum ContextAction {
    Show,
    Set {
        #[arg(long, default_value = "")]
        notes: String,

        #[arg(long, default_value = "")]
        links: String,
    },
}

#[derive(Subcommand)]
enum ImageAction {
    List,
    /// Create an image entry awaiting its payload
    Register { name: String },
    /// Attach a data URL payload to a registered image
    Attach { id: String, data_url: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CatalystConfig::load_with_env(cli.config.as_deref())?;
    let service = Arc::new(ContentService::from_config(&config)?);

    match cli.command {
        Commands::Context { action } => context_command(&service, action),
        Commands::Images { action } => images_command(&service, action),
        Commands::Generate {
            kind,
            count,
            notes,
            links,
            image,
        } => generate_command(&service, kind, count, notes, links, image).await,
        Commands::List { watch, json } => {
            if watch {
                watch_command(service, &config, json).await
            } else {
                let items = service.list_content().await?;
                print_items(&items, json)
            }
        }
        Commands::Status { id, status } => {
            let item = service.set_status(&ContentId(id), status)?;
            print_items(&[item], false)
        }
        Commands::Schedule { id, at } => {
            let item = service.set_schedule(&ContentId(id), at)?;
            print_items(&[item], false)
        }
        Commands::Delete { id } => {
            service.delete_content(&ContentId(id.clone()))?;
            info!("Deleted {id}");
            Ok(())
        }
    }
}

fn context_command(service: &ContentService, action: ContextAction) -> Result<()> {
    match action {
        ContextAction::Show => {
            let context = service.get_context()?;
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        ContextAction::Set { notes, links } => {
            service.save_context(&UserContext::new(notes, links))?;
            info!("Context saved");
        }
    }
    Ok(())
}

fn images_command(service: &ContentService, action: ImageAction) -> Result<()> {
    match action {
        ImageAction::List => {
            for image in service.list_images()? {
                let state = if image.is_uploaded() { "ready" } else { "awaiting upload" };
                println!("{}  {}  ({state})", image.id, image.name);
            }
        }
        ImageAction::Register { name } => {
            let image = service.register_image(&name)?;
            println!("{}", image.id);
        }
        ImageAction::Attach { id, data_url } => {
            if !data_url.starts_with("data:") {
                anyhow::bail!("expected a data: URL for image {id}");
            }
            let image = service.complete_upload(&id, &data_url)?;
            info!("Attached payload to {} ({})", image.id, image.name);
        }
        ImageAction::Delete { id } => {
            service.delete_image(&id)?;
            info!("Deleted image {id}");
        }
    }
    Ok(())
}

async fn generate_command(
    service: &ContentService,
    kind: ContentType,
    count: usize,
    notes: Option<String>,
    links: Option<String>,
    image: Option<String>,
) -> Result<()> {
    let mut request = GenerationRequest::new(kind, count);
    if notes.is_some() || links.is_some() {
        request = request.with_context(UserContext::new(
            notes.unwrap_or_default(),
            links.unwrap_or_default(),
        ));
    }
    if let Some(image) = image {
        request = request.with_start_image(image);
    }

    let items = service
        .generate(request)
        .await
        .context("generation request failed")?;
    print_items(&items, false)?;
    if has_outstanding_jobs(&items) {
        info!("Video jobs submitted; run `catalyst list --watch` to follow them");
    }
    Ok(())
}

async fn watch_command(service: Arc<ContentService>, config: &CatalystConfig, json: bool) -> Result<()> {
    let monitor = RefreshMonitor::spawn(service, config.poll_interval());
    let mut snapshots = monitor.subscribe();

    loop {
        snapshots.changed().await?;
        let items = snapshots.borrow_and_update().clone();
        print_items(&items, json)?;
        if !has_outstanding_jobs(&items) {
            break;
        }
        let generating = items
            .iter()
            .filter(|item| item.status == ContentStatus::Generating)
            .count();
        info!("{generating} item(s) still generating, refreshing every {:?}", config.poll_interval());
    }

    monitor.shutdown().await;
    Ok(())
}

fn print_items(items: &[ContentItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    for item in items {
        let detail = match (&item.schedule, &item.error_message) {
            (Some(at), _) => format!("  @ {}", at.to_rfc3339()),
            (None, Some(err)) => format!("  ! {err}"),
            _ => String::new(),
        };
        println!(
            "{:<28} {:<6} {:<10} {}{}",
            item.id,
            item.kind,
            item.status,
            item.prompt,
            detail
        );
    }
    Ok(())
}
