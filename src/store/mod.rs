//! Destination note store
//!
//! The importer writes through the [`NoteStore`] trait. [`JoplinClient`]
//! talks to the Joplin Data API; [`MemoryStore`] keeps everything in
//! process for dry runs.

mod joplin;
mod memory;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qnap::Timestamps;

pub use joplin::JoplinClient;
pub use memory::{MemoryFolder, MemoryNote, MemoryResource, MemoryStore, MemoryStoreState};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Item types understood by the store's search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Tag,
    Resource,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Tag => "tag",
            ItemKind::Resource => "resource",
        }
    }
}

/// Minimal view of a stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceMetadata {
    pub id: String,
    #[serde(default)]
    pub size: u64,
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create_folder(
        &self,
        parent_id: &str,
        title: &str,
        times: Timestamps,
    ) -> Result<StoreItem>;

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: Timestamps,
    ) -> Result<StoreItem>;

    async fn create_tag(&self, name: &str) -> Result<StoreItem>;

    async fn attach_tag(&self, note_id: &str, tag_id: &str) -> Result<()>;

    async fn search(&self, query: &str, kind: ItemKind) -> Result<Vec<StoreItem>>;

    async fn get_resource_metadata(&self, id: &str) -> Result<ResourceMetadata>;

    /// Create a resource from a file on disk
    async fn create_resource(&self, title: &str, file: &Path) -> Result<StoreItem>;

    /// Reuse the first tag found for the lower-cased name, or create it
    async fn find_or_create_tag(&self, name: &str) -> Result<StoreItem> {
        let existing = self.search(&name.to_lowercase(), ItemKind::Tag).await?;
        match existing.into_iter().next() {
            Some(tag) => Ok(tag),
            None => self.create_tag(name).await,
        }
    }
}
