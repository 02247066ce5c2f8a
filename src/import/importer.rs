use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resources::ResourceBridge;
use crate::markdown::export_document_to_markdown;
use crate::qnap::{Level, Location, Note, Parent, QnapArchive, QnapError};
use crate::store::{NoteStore, StoreError, StoreItem};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Archive error: {0}")]
    Archive(#[from] QnapError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Number of items written by an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub notebooks: usize,
    pub sections: usize,
    pub notes: usize,
    /// Tag attachments, not distinct tags
    pub tags: usize,
}

/// Preview metadata for an archive, read from `data.json` alone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    /// Number of notebooks found
    pub notebook_count: usize,
    /// Number of sections across all notebooks
    pub section_count: usize,
    /// Number of notes across all sections
    pub note_count: usize,
    pub notebooks: Vec<NotebookPreview>,
    /// Suggested destination folder name
    pub suggested_name: String,
    /// Warnings during preview
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookPreview {
    pub name: String,
    pub created: Option<String>,
    pub sections: Vec<SectionPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPreview {
    pub name: String,
    pub note_count: usize,
}

/// Preview an archive without reading any note record
pub fn preview_archive(archive: &QnapArchive) -> Result<ImportPreview> {
    let manifest = archive.manifest()?;
    let mut warnings = Vec::new();
    let mut notebooks = Vec::with_capacity(manifest.notebooks.len());
    let mut section_count = 0;
    let mut note_count = 0;

    for notebook in &manifest.notebooks {
        if notebook.sections.is_empty() {
            warnings.push(format!("Notebook '{}' has no sections", notebook.name));
        }
        let sections = notebook
            .sections
            .iter()
            .map(|section| {
                if section.notes.is_empty() {
                    warnings.push(format!(
                        "Section '{}/{}' has no notes",
                        notebook.name, section.name
                    ));
                }
                SectionPreview {
                    name: section.name.clone(),
                    note_count: section.notes.len(),
                }
            })
            .collect::<Vec<_>>();

        section_count += sections.len();
        note_count += sections.iter().map(|s| s.note_count).sum::<usize>();
        notebooks.push(NotebookPreview {
            name: notebook.name.clone(),
            created: notebook.times().created.map(|t| t.to_rfc3339()),
            sections,
        });
    }

    if notebooks.is_empty() {
        warnings.push("No notebooks found in archive".to_string());
    }

    let suggested_name = archive
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "QNAP Import".to_string());

    Ok(ImportPreview {
        notebook_count: notebooks.len(),
        section_count,
        note_count,
        notebooks,
        suggested_name,
        warnings,
    })
}

/// Copies an archive's hierarchy into a note store
///
/// Work is strictly sequential: one request in flight at a time, in archive
/// order. The first error aborts the run; items written before it stay in
/// the store.
pub struct Importer<'a, S: NoteStore + ?Sized> {
    archive: &'a QnapArchive,
    store: &'a S,
}

impl<'a, S: NoteStore + ?Sized> Importer<'a, S> {
    pub fn new(archive: &'a QnapArchive, store: &'a S) -> Self {
        Self { archive, store }
    }

    /// Import every notebook below the folder `parent_id`
    pub async fn import(&self, parent_id: &str) -> Result<ImportSummary> {
        let manifest = self.archive.manifest()?;
        let mut summary = ImportSummary::default();

        for notebook in manifest.children(self.archive) {
            let notebook = notebook?;
            log::info!("Notebook: {}", notebook.name());
            let notebook_folder = self
                .store
                .create_folder(parent_id, notebook.name(), notebook.times())
                .await?;
            summary.notebooks += 1;

            for section in notebook.children(self.archive) {
                let section = section?;
                log::info!("- {}", section.name());
                let section_folder = self
                    .store
                    .create_folder(&notebook_folder.id, section.name(), section.times())
                    .await?;
                summary.sections += 1;

                for note in section.children(self.archive) {
                    let note = note?;
                    log::info!("-- {}", note.name());
                    summary.tags += self
                        .import_note(&section_folder.id, &note)
                        .await
                        .map_err(|e| {
                            log::error!("Import stopped at note {}: {}", note.location, e);
                            e
                        })?
                        .1;
                    summary.notes += 1;
                }
            }
        }

        log::info!(
            "Imported {} notebooks, {} sections, {} notes",
            summary.notebooks,
            summary.sections,
            summary.notes
        );
        Ok(summary)
    }

    /// Import the single note at `location` into the folder `folder_id`
    pub async fn import_location(&self, folder_id: &str, location: &Location) -> Result<StoreItem> {
        let note = self.archive.note(location)?;
        log::info!("-- {}", note.name());
        Ok(self.import_note(folder_id, &note).await?.0)
    }

    /// Render a note to Markdown, uploading its resources
    pub async fn convert_note(&self, note: &Note) -> Result<String> {
        let document = note.document()?;
        let bridge = ResourceBridge::new(self.archive, self.store);
        Ok(export_document_to_markdown(&document, &note.location, &bridge).await?)
    }

    /// Returns the created note and the number of tags attached to it
    async fn import_note(&self, folder_id: &str, note: &Note) -> Result<(StoreItem, usize)> {
        let body = self.convert_note(note).await?;
        let created = self
            .store
            .create_note(folder_id, note.name(), &body, note.times())
            .await?;

        let mut attached = 0;
        for tag in note.children(self.archive) {
            let tag = tag?;
            let stored = self.store.find_or_create_tag(tag.name()).await?;
            self.store.attach_tag(&created.id, &stored.id).await?;
            attached += 1;
        }
        Ok((created, attached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::PLACEHOLDER_RESOURCE_ID;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// A `noteInfo.json` record whose content is the JSON-encoded document
    fn note_info(name: &str, document: Value, tags: &[&str]) -> Vec<u8> {
        let tag_list: Vec<Value> = tags.iter().map(|t| json!({ "tag_name": t })).collect();
        serde_json::to_vec(&json!({
            "note_name": name,
            "create_time": "2020-01-02 03:04:05",
            "update_time": "2021-06-07 08:09:10",
            "content": document.to_string(),
            "tag_list": tag_list,
        }))
        .unwrap()
    }

    fn paragraph(text: &str) -> Value {
        json!({ "type": "paragraph", "content": [{ "type": "text", "text": text }] })
    }

    fn write_archive(dir: &TempDir, entries: Vec<(String, Vec<u8>)>) -> QnapArchive {
        let path = dir.path().join("Work Notes.ns3");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        for (name, data) in entries {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap();
        QnapArchive::open(path).unwrap()
    }

    fn sample_archive(dir: &TempDir) -> QnapArchive {
        let manifest = json!({
            "notebooks": [
                {
                    "nb_name": "Work",
                    "create_time": "2019-05-06 07:08:09",
                    "sec_list": [
                        {
                            "sec_name": "Meetings",
                            "note_list": [
                                { "note_location": "1/1/1" },
                                { "note_location": "1/1/2" }
                            ]
                        },
                        { "sec_name": "Empty", "note_list": [] }
                    ]
                },
                {
                    "nb_name": "Home",
                    "sec_list": [
                        { "sec_name": "Recipes", "note_list": [{ "note_location": "2/1/1" }] }
                    ]
                }
            ]
        });

        let with_image = json!({
            "type": "doc",
            "content": [
                paragraph("Agenda"),
                {
                    "type": "paragraph",
                    "content": [
                        { "type": "image", "attrs": { "src": "./image/board.png", "title": "Board" } },
                        { "type": "file", "attrs": { "src": "./attachment/minutes.pdf" } }
                    ]
                }
            ]
        });

        write_archive(
            dir,
            vec![
                ("data.json".to_string(), manifest.to_string().into_bytes()),
                (
                    "1/1/1/noteInfo.json".to_string(),
                    note_info("Kickoff", with_image, &["Planning", "q3"]),
                ),
                ("1/1/1/image/board.png".to_string(), b"PNG".to_vec()),
                ("1/1/1/attachment/minutes.pdf".to_string(), b"%PDF-1.4".to_vec()),
                (
                    "1/1/2/noteInfo.json".to_string(),
                    note_info(
                        "Path notes",
                        json!({ "type": "doc", "content": [paragraph("C:\\temp \"quoted\"")] }),
                        &["planning"],
                    ),
                ),
                (
                    "2/1/1/noteInfo.json".to_string(),
                    note_info("Soup", json!({ "type": "doc", "content": [paragraph("Salt")] }), &[]),
                ),
            ],
        )
    }

    #[tokio::test]
    async fn test_import_builds_hierarchy_in_order() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);
        let store = MemoryStore::new();

        let summary = Importer::new(&archive, &store).import("root").await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                notebooks: 2,
                sections: 3,
                notes: 3,
                tags: 3,
            }
        );

        let state = store.snapshot();
        let titles: Vec<&str> = state.folders.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, ["Work", "Meetings", "Empty", "Home", "Recipes"]);
        assert_eq!(state.folders[0].parent_id, "root");
        assert_eq!(state.folders[1].parent_id, state.folders[0].id);
        assert_eq!(state.folders[4].parent_id, state.folders[3].id);
        assert_eq!(
            state.folders[0].times.created,
            Some(Utc.with_ymd_and_hms(2019, 5, 6, 7, 8, 9).unwrap())
        );

        let notes: Vec<&str> = state.notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(notes, ["Kickoff", "Path notes", "Soup"]);
        assert_eq!(state.notes[0].parent_id, state.folders[1].id);
        assert_eq!(state.notes[2].parent_id, state.folders[4].id);
        assert_eq!(
            state.notes[0].times.updated,
            Some(Utc.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap())
        );
    }

    #[tokio::test]
    async fn test_import_renders_bodies_and_resources() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);
        let store = MemoryStore::new();

        Importer::new(&archive, &store).import("root").await.unwrap();
        let state = store.snapshot();

        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].title, "Board");
        assert_eq!(state.resources[0].data, b"PNG");
        assert_eq!(state.resources[1].title, "minutes.pdf");
        assert_eq!(
            state.notes[0].body,
            format!(
                "Agenda\n![Board](:/{})[minutes.pdf](:/{})\n",
                state.resources[0].id, state.resources[1].id
            )
        );
        assert_eq!(state.notes[1].body, "C:\\temp \"quoted\"\n");
        assert_eq!(state.notes[2].body, "Salt\n");
    }

    #[tokio::test]
    async fn test_tags_are_shared_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);
        let store = MemoryStore::new();

        Importer::new(&archive, &store).import("root").await.unwrap();
        let state = store.snapshot();

        let tags: Vec<&str> = state.tags.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(tags, ["planning", "q3"]);
        assert_eq!(state.notes[0].tag_ids, [state.tags[0].id.clone(), state.tags[1].id.clone()]);
        assert_eq!(state.notes[1].tag_ids, [state.tags[0].id.clone()]);
        assert!(state.notes[2].tag_ids.is_empty());
    }

    #[tokio::test]
    async fn test_missing_note_aborts_and_keeps_partial_tree() {
        let dir = TempDir::new().unwrap();
        let manifest = json!({
            "notebooks": [{
                "nb_name": "Work",
                "sec_list": [{
                    "sec_name": "Inbox",
                    "note_list": [{ "note_location": "1/1/1" }, { "note_location": "1/1/9" }]
                }]
            }]
        });
        let archive = write_archive(
            &dir,
            vec![
                ("data.json".to_string(), manifest.to_string().into_bytes()),
                (
                    "1/1/1/noteInfo.json".to_string(),
                    note_info("First", json!({ "type": "doc", "content": [] }), &[]),
                ),
            ],
        );
        let store = MemoryStore::new();

        let result = Importer::new(&archive, &store).import("root").await;
        assert!(matches!(
            result,
            Err(ImportError::Archive(QnapError::EntryNotFound(_)))
        ));
        let state = store.snapshot();
        assert_eq!(state.folders.len(), 2);
        assert_eq!(state.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_uploads_leave_placeholder_links() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);
        let store = MemoryStore::with_failing_uploads();

        let summary = Importer::new(&archive, &store).import("root").await.unwrap();
        assert_eq!(summary.notes, 3);
        assert_eq!(
            store.snapshot().notes[0].body,
            format!(
                "Agenda\n![Board](:/{id})[minutes.pdf](:/{id})\n",
                id = PLACEHOLDER_RESOURCE_ID
            )
        );
    }

    #[tokio::test]
    async fn test_import_location_probe() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);
        let store = MemoryStore::new();

        let item = Importer::new(&archive, &store)
            .import_location("probe", &Location::new("/1/1/2/"))
            .await
            .unwrap();

        let state = store.snapshot();
        assert!(state.folders.is_empty());
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.notes[0].id, item.id);
        assert_eq!(state.notes[0].parent_id, "probe");
        assert_eq!(state.notes[0].tag_ids.len(), 1);
    }

    #[test]
    fn test_preview_reads_manifest_only() {
        let dir = TempDir::new().unwrap();
        let archive = sample_archive(&dir);

        let preview = preview_archive(&archive).unwrap();
        assert_eq!(preview.notebook_count, 2);
        assert_eq!(preview.section_count, 3);
        assert_eq!(preview.note_count, 3);
        assert_eq!(preview.suggested_name, "Work Notes");
        assert_eq!(preview.notebooks[0].sections[0].note_count, 2);
        assert_eq!(
            preview.notebooks[0].created.as_deref(),
            Some("2019-05-06T07:08:09+00:00")
        );
        assert_eq!(preview.warnings, ["Section 'Work/Empty' has no notes"]);

        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["noteCount"], 3);
    }

    #[test]
    fn test_preview_of_empty_archive_warns() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir, vec![("data.json".to_string(), b"{}".to_vec())]);

        let preview = preview_archive(&archive).unwrap();
        assert_eq!(preview.note_count, 0);
        assert_eq!(preview.warnings, ["No notebooks found in archive"]);
    }
}
