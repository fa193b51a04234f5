//! Keepsake library root.

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod service;
pub mod store;
pub mod web;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use record::{MemoryDraft, MemoryPatch, MemoryRecord};
pub use service::{MemoryService, ProgressObserver};
pub use store::{blob_path_from_url, BlobStore, DocumentStore};
