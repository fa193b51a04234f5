//! API endpoints module.

pub mod memories;

pub use memories::{create_memory, delete_memory, fetch_media, list_memories, update_memory};
