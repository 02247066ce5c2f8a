use async_trait::async_trait;

use crate::markdown::ResourceResolver;
use crate::qnap::content::FileAttrs;
use crate::qnap::{self, Location, QnapArchive, QnapError, ResourceKind};
use crate::store::{self, ItemKind, NoteStore};

/// Id rendered in place of a resource whose upload failed
pub const PLACEHOLDER_RESOURCE_ID: &str = "00000000000000000000000000000000";

/// Moves resource files from the archive into the note store
///
/// Resources are deduplicated by title and byte length only: an existing
/// resource with the same title and size is reused without comparing content.
pub struct ResourceBridge<'a, S: NoteStore + ?Sized> {
    archive: &'a QnapArchive,
    store: &'a S,
}

impl<'a, S: NoteStore + ?Sized> ResourceBridge<'a, S> {
    pub fn new(archive: &'a QnapArchive, store: &'a S) -> Self {
        Self { archive, store }
    }

    /// Read `<location>/<kind>/<filename>` from the archive on the blocking pool
    pub async fn fetch(
        &self,
        location: &Location,
        kind: ResourceKind,
        filename: &str,
    ) -> qnap::Result<Vec<u8>> {
        let archive = self.archive.clone();
        let location = location.clone();
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || archive.read_resource(&location, kind, &filename))
            .await
            .map_err(|e| QnapError::Io(std::io::Error::other(e)))?
    }

    /// Store `data` under `title` and return its id.
    ///
    /// Never fails: on error the placeholder id is returned and the failure
    /// is logged.
    pub async fn upload(&self, title: &str, data: &[u8]) -> String {
        match self.try_upload(title, data).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Failed to upload resource '{}': {}", title, e);
                PLACEHOLDER_RESOURCE_ID.to_string()
            }
        }
    }

    async fn find_existing(&self, title: &str, size: u64) -> store::Result<Option<String>> {
        for item in self.store.search(title, ItemKind::Resource).await? {
            let metadata = self.store.get_resource_metadata(&item.id).await?;
            if metadata.size == size {
                return Ok(Some(metadata.id));
            }
        }
        Ok(None)
    }

    async fn try_upload(&self, title: &str, data: &[u8]) -> store::Result<String> {
        if let Some(id) = self.find_existing(title, data.len() as u64).await? {
            log::debug!("Reusing resource {} for '{}'", id, title);
            return Ok(id);
        }

        // Removed when dropped, whichever way this function returns
        let staging = tempfile::Builder::new()
            .prefix("qnap-resource")
            .tempdir()?;
        let path = staging.path().join(staged_file_name(title));
        tokio::fs::write(&path, data).await?;

        let item = self.store.create_resource(title, &path).await?;
        log::debug!("Uploaded resource '{}' as {}", title, item.id);
        Ok(item.id)
    }
}

/// File name for the staged copy; the store derives the file type from it
fn staged_file_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        "resource".to_string()
    } else {
        name.to_string()
    }
}

#[async_trait]
impl<'a, S: NoteStore + ?Sized> ResourceResolver for ResourceBridge<'a, S> {
    async fn resolve(
        &self,
        location: &Location,
        kind: ResourceKind,
        attrs: &FileAttrs,
    ) -> qnap::Result<String> {
        let data = self.fetch(location, kind, attrs.filename()).await?;
        Ok(self.upload(attrs.title(), &data).await)
    }
}
