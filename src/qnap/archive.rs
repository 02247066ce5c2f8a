//! Random access to entries of a QNAP Notes Station export (`.ns3`, a ZIP container)

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::ZipArchive;

use super::errors::{QnapError, Result};
use super::models::{Manifest, Note};

/// Name of the root manifest inside the archive
pub const MANIFEST_ENTRY: &str = "data.json";

/// Name of the per-note metadata record below a note's location
pub const NOTE_INFO_ENTRY: &str = "noteInfo.json";

/// Ordinal, slash separated position of a note inside the archive (e.g. `1/4/2`).
///
/// The location is also the directory prefix of the note's resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Location(String);

impl Location {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into().trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the note's metadata record
    pub fn note_info_path(&self) -> String {
        format!("{}/{}", self.0, NOTE_INFO_ENTRY)
    }

    /// Path of a resource file stored next to the note
    pub fn resource_path(&self, kind: ResourceKind, filename: &str) -> String {
        format!("{}/{}/{}", self.0, kind.dir_name(), filename)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.0
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of a binary resource referenced from note content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Attachment,
}

impl ResourceKind {
    /// Directory holding resources of this kind below a note location
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Attachment => "attachment",
        }
    }
}

/// Read-only handle on an archive file.
///
/// No ZIP handle is kept open between calls: every read opens the container,
/// extracts one entry and closes it again.
#[derive(Debug, Clone)]
pub struct QnapArchive {
    path: PathBuf,
}

impl QnapArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QnapError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("QNAP archive not found: {}", path.display()),
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw bytes of one entry
    pub fn read_entry(&self, entry_path: &str) -> Result<Vec<u8>> {
        log::debug!("Reading {} from {:?}", entry_path, self.path);

        let file = File::open(&self.path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut entry = match archive.by_name(entry_path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(QnapError::EntryNotFound(entry_path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read a resource stored at `<location>/<kind>/<filename>`
    pub fn read_resource(
        &self,
        location: &Location,
        kind: ResourceKind,
        filename: &str,
    ) -> Result<Vec<u8>> {
        self.read_entry(&location.resource_path(kind, filename))
    }

    /// Parse the root manifest (`data.json`)
    pub fn manifest(&self) -> Result<Manifest> {
        let data = self.read_entry(MANIFEST_ENTRY)?;
        serde_json::from_slice(&data)
            .map_err(|e| QnapError::MalformedContent(format!("{}: {}", MANIFEST_ENTRY, e)))
    }

    /// Read and decode the metadata record of the note at `location`
    pub fn note(&self, location: &Location) -> Result<Note> {
        let data = self.read_entry(&location.note_info_path())?;
        Note::from_note_info(location.clone(), &data)
    }
}
