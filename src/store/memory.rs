use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ItemKind, NoteStore, ResourceMetadata, Result, StoreError, StoreItem};
use crate::qnap::Timestamps;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFolder {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub times: Timestamps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNote {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub body: String,
    pub times: Timestamps,
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryResource {
    pub id: String,
    pub title: String,
    pub data: Vec<u8>,
}

/// Everything written to a [`MemoryStore`], in write order
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreState {
    pub folders: Vec<MemoryFolder>,
    pub notes: Vec<MemoryNote>,
    pub tags: Vec<StoreItem>,
    pub resources: Vec<MemoryResource>,
    /// Number of `create_resource` calls, failed ones included
    pub resource_creates: usize,
}

/// Note store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryStoreState>,
    fail_resource_uploads: bool,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `create_resource` always fails
    pub fn with_failing_uploads() -> Self {
        Self {
            state: Mutex::default(),
            fail_resource_uploads: true,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryStoreState> {
        // A panic while holding the lock leaves plain data behind
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> MemoryStoreState {
        self.state().clone()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create_folder(
        &self,
        parent_id: &str,
        title: &str,
        times: Timestamps,
    ) -> Result<StoreItem> {
        let folder = MemoryFolder {
            id: new_id(),
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            times,
        };
        let item = StoreItem {
            id: folder.id.clone(),
            title: folder.title.clone(),
        };
        self.state().folders.push(folder);
        Ok(item)
    }

    async fn create_note(
        &self,
        parent_id: &str,
        title: &str,
        body: &str,
        times: Timestamps,
    ) -> Result<StoreItem> {
        let note = MemoryNote {
            id: new_id(),
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            times,
            tag_ids: Vec::new(),
        };
        let item = StoreItem {
            id: note.id.clone(),
            title: note.title.clone(),
        };
        self.state().notes.push(note);
        Ok(item)
    }

    async fn create_tag(&self, name: &str) -> Result<StoreItem> {
        let tag = StoreItem {
            id: new_id(),
            title: name.to_lowercase(),
        };
        self.state().tags.push(tag.clone());
        Ok(tag)
    }

    async fn attach_tag(&self, note_id: &str, tag_id: &str) -> Result<()> {
        let mut state = self.state();
        if !state.tags.iter().any(|t| t.id == tag_id) {
            return Err(StoreError::NotFound(format!("tags/{}", tag_id)));
        }
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| StoreError::NotFound(format!("notes/{}", note_id)))?;
        if !note.tag_ids.iter().any(|id| id == tag_id) {
            note.tag_ids.push(tag_id.to_string());
        }
        Ok(())
    }

    async fn search(&self, query: &str, kind: ItemKind) -> Result<Vec<StoreItem>> {
        let state = self.state();
        let items = match kind {
            ItemKind::Tag => state
                .tags
                .iter()
                .filter(|t| t.title == query.to_lowercase())
                .cloned()
                .collect(),
            ItemKind::Resource => state
                .resources
                .iter()
                .filter(|r| r.title == query)
                .map(|r| StoreItem {
                    id: r.id.clone(),
                    title: r.title.clone(),
                })
                .collect(),
        };
        Ok(items)
    }

    async fn get_resource_metadata(&self, id: &str) -> Result<ResourceMetadata> {
        self.state()
            .resources
            .iter()
            .find(|r| r.id == id)
            .map(|r| ResourceMetadata {
                id: r.id.clone(),
                size: r.data.len() as u64,
            })
            .ok_or_else(|| StoreError::NotFound(format!("resources/{}", id)))
    }

    async fn create_resource(&self, title: &str, file: &Path) -> Result<StoreItem> {
        self.state().resource_creates += 1;
        if self.fail_resource_uploads {
            return Err(StoreError::Server {
                status: 500,
                message: "resource uploads disabled".to_string(),
            });
        }

        let data = tokio::fs::read(file).await?;
        let resource = MemoryResource {
            id: new_id(),
            title: title.to_string(),
            data,
        };
        let item = StoreItem {
            id: resource.id.clone(),
            title: resource.title.clone(),
        };
        self.state().resources.push(resource);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_or_create_tag_reuses_lowercase_match() {
        let store = MemoryStore::new();
        let first = store.find_or_create_tag("Physics").await.unwrap();
        let second = store.find_or_create_tag("physics").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.snapshot().tags.len(), 1);
    }

    #[tokio::test]
    async fn test_attach_tag_once() {
        let store = MemoryStore::new();
        let note = store
            .create_note("", "N", "body", Timestamps::default())
            .await
            .unwrap();
        let tag = store.create_tag("t").await.unwrap();

        store.attach_tag(&note.id, &tag.id).await.unwrap();
        store.attach_tag(&note.id, &tag.id).await.unwrap();
        assert_eq!(store.snapshot().notes[0].tag_ids, vec![tag.id.clone()]);

        assert!(matches!(
            store.attach_tag("missing", &tag.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_look_like_joplin_ids() {
        let store = MemoryStore::new();
        let folder = store
            .create_folder("", "Physics", Timestamps::default())
            .await
            .unwrap();
        assert_eq!(folder.id.len(), 32);
        assert!(folder.id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
