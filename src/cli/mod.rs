//! CLI commands for Keepsake using clap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::asset::LocalAsset;
use crate::config::{load_settings, Backend, Settings};
use crate::record::{MemoryDraft, MemoryPatch, MemoryRecord};
use crate::service::MemoryService;
use crate::store::fs::FsBlobStore;
use crate::store::http::{HttpBlobStore, HttpDocumentStore};
use crate::store::sqlite::SqliteDocumentStore;
use crate::store::{BlobStore, DocumentStore};
use crate::web::{run_server, AppState, WebServerConfig};

/// Keepsake - a photo memory journal.
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(version = "0.1.0")]
#[command(about = "Keepsake - capture photo memories", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a new memory
    Add {
        /// Title for the memory
        title: String,

        /// Optional description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Path to a photo to attach
        #[arg(long, short = 'i')]
        image: Option<PathBuf>,
    },

    /// List saved memories, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename a memory (title only)
    Rename {
        /// Memory id
        id: String,

        /// New title
        title: String,
    },

    /// Edit a memory's fields
    Edit {
        /// Memory id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Replacement photo (the previous one stays in the blob store)
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Delete a memory and its photo
    Delete {
        /// Memory id
        id: String,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Add {
                title,
                description,
                image,
            } => cmd_add(title, description.as_deref(), image.as_deref()).await,
            Command::List { json } => cmd_list(*json).await,
            Command::Rename { id, title } => cmd_rename(id, title).await,
            Command::Edit {
                id,
                title,
                description,
                image,
            } => cmd_edit(id, title, description, image).await,
            Command::Delete { id } => cmd_delete(id).await,
            Command::Serve { port } => cmd_serve(*port).await,
        }
    }
}

/// Wire up the service from settings. Returns the blob root when the local
/// backend is in use so `serve` can expose /media.
fn build_service(settings: &Settings) -> Result<(MemoryService, Option<PathBuf>)> {
    match settings.backend {
        Backend::Local => {
            let data_dir = settings.resolve_data_dir()?;
            let blob_root = data_dir.join("blobs");
            let base_url = format!(
                "http://{}:{}/media",
                settings.web.host, settings.web.port
            );
            let documents: Arc<dyn DocumentStore> =
                Arc::new(SqliteDocumentStore::open(data_dir.join("memories.db"))?);
            let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&blob_root, base_url));
            Ok((MemoryService::new(documents, blobs), Some(blob_root)))
        }
        Backend::Remote => {
            let base_url = settings
                .remote
                .base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("remote.base_url is not set"))?;
            let documents: Arc<dyn DocumentStore> = Arc::new(HttpDocumentStore::new(
                &base_url,
                &settings.remote.collection,
                settings.remote.api_token.clone(),
            ));
            let blobs: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
                &base_url,
                settings.remote.api_token.clone(),
            ));
            Ok((MemoryService::new(documents, blobs), None))
        }
    }
}

// Command implementations

async fn cmd_add(title: &str, description: Option<&str>, image: Option<&Path>) -> Result<()> {
    let settings = load_settings()?;
    let (service, _) = build_service(&settings)?;

    let draft = MemoryDraft {
        title: title.to_string(),
        description: description.map(String::from),
        image: image.map(LocalAsset::new),
    };
    let id = service.create(draft).await?;
    println!("Saved memory {}", id);
    Ok(())
}

async fn cmd_list(json: bool) -> Result<()> {
    let settings = load_settings()?;
    let (service, _) = build_service(&settings)?;

    let records = service.list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No memories yet.");
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &MemoryRecord) {
    let when = chrono::DateTime::from_timestamp_millis(record.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    println!("{}  {}  {}", record.id, when, record.title);
    if let Some(description) = &record.description {
        println!("    {}", description);
    }
    if record.has_image() {
        println!("    {}", record.image_url);
    }
}

async fn cmd_rename(id: &str, title: &str) -> Result<()> {
    let settings = load_settings()?;
    let (service, _) = build_service(&settings)?;

    service.rename(id, title).await?;
    println!("Renamed memory {}", id);
    Ok(())
}

async fn cmd_edit(
    id: &str,
    title: &Option<String>,
    description: &Option<String>,
    image: &Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings()?;
    let (service, _) = build_service(&settings)?;

    let patch = MemoryPatch {
        title: title.clone(),
        description: description.clone(),
        image: image.as_ref().map(LocalAsset::new),
    };
    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    service.update(id, patch).await?;
    println!("Updated memory {}", id);
    Ok(())
}

async fn cmd_delete(id: &str) -> Result<()> {
    let settings = load_settings()?;
    let (service, _) = build_service(&settings)?;

    // Deleting the blob needs the stored download URL.
    let records = service.list().await?;
    let record = records
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow::anyhow!("No memory with id {}", id))?;

    service.delete(id, &record.image_url).await?;
    println!("Deleted memory {}", id);
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<()> {
    let settings = load_settings()?;
    let (service, blob_root) = build_service(&settings)?;

    let config = WebServerConfig {
        host: settings.web.host.clone(),
        port: port.unwrap_or(settings.web.port),
    };
    let state = AppState {
        service: Arc::new(service),
        blob_root,
    };
    run_server(config, state)
        .await
        .map_err(|e| anyhow::anyhow!("web server error: {}", e))
}
