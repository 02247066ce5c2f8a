use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use super::archive::{Location, QnapArchive};
use super::content::{self, Document};
use super::errors::{QnapError, Result};
use super::walker::{Level, Parent};

/// Timestamp as stored in the archive
///
/// Notes Station writes `YYYY-MM-DD HH:MM:SS` in UTC; epoch seconds are
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Text(String),
    Epoch(i64),
}

impl RawTime {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTime::Epoch(secs) => Utc.timestamp_opt(*secs, 0).single(),
            RawTime::Text(text) => {
                let text = text.trim();
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .map(|naive| naive.and_utc())
                    .ok()
                    .or_else(|| {
                        DateTime::parse_from_rfc3339(text)
                            .map(|dt| dt.with_timezone(&Utc))
                            .ok()
                    })
            }
        }
    }
}

/// Creation and update time of an archive item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl Timestamps {
    fn from_raw(created: Option<&RawTime>, updated: Option<&RawTime>) -> Self {
        Self {
            created: created.and_then(RawTime::to_utc),
            updated: updated.and_then(RawTime::to_utc),
        }
    }
}

/// Root manifest (`data.json`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notebook {
    #[serde(rename = "nb_name", default)]
    pub name: String,
    #[serde(default)]
    pub create_time: Option<RawTime>,
    #[serde(default)]
    pub update_time: Option<RawTime>,
    #[serde(rename = "sec_list", default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    #[serde(rename = "sec_name", default)]
    pub name: String,
    #[serde(default)]
    pub create_time: Option<RawTime>,
    #[serde(default)]
    pub update_time: Option<RawTime>,
    #[serde(rename = "note_list", default)]
    pub notes: Vec<NoteRef>,
}

/// Unresolved note entry of a section; only the location is known
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NoteRef {
    #[serde(rename = "note_location")]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    #[serde(rename = "tag_name", default)]
    pub name: String,
    #[serde(default)]
    pub create_time: Option<RawTime>,
    #[serde(default)]
    pub update_time: Option<RawTime>,
}

/// Shape of `noteInfo.json`
#[derive(Debug, Deserialize)]
struct NoteInfo {
    #[serde(default)]
    note_name: String,
    #[serde(default)]
    create_time: Option<RawTime>,
    #[serde(default)]
    update_time: Option<RawTime>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    tag_list: Vec<Tag>,
}

/// A note materialized from its `noteInfo.json` record
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub location: Location,
    pub name: String,
    pub create_time: Option<RawTime>,
    pub update_time: Option<RawTime>,
    /// Content as left by the outer parse: still escaped, sentinels in place
    pub raw_content: String,
    pub tags: Vec<Tag>,
}

impl Note {
    /// Decode a raw `noteInfo.json` record
    pub fn from_note_info(location: Location, data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data).map_err(|e| {
            QnapError::MalformedContent(format!("{}: invalid UTF-8: {}", location, e))
        })?;
        let protected = content::protect_backslashes(text);
        let info: NoteInfo = serde_json::from_str(&protected)
            .map_err(|e| QnapError::MalformedContent(format!("{}: {}", location, e)))?;

        let tags = info
            .tag_list
            .into_iter()
            .map(|tag| Tag {
                name: content::restore_backslashes(&tag.name),
                ..tag
            })
            .collect();

        Ok(Self {
            location,
            name: content::restore_backslashes(&info.note_name),
            create_time: info.create_time,
            update_time: info.update_time,
            raw_content: info.content,
            tags,
        })
    }

    /// Parse the rich-text document held in the note's content field
    pub fn document(&self) -> Result<Document> {
        content::decode_document(&self.raw_content)
    }
}

impl Parent for Manifest {
    type Child = Notebook;

    fn child_stubs(&self) -> &[Notebook] {
        &self.notebooks
    }
}

impl Level for Notebook {
    type Stub = Notebook;

    fn resolve(_archive: &QnapArchive, stub: &Notebook) -> Result<Self> {
        Ok(stub.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn times(&self) -> Timestamps {
        Timestamps::from_raw(self.create_time.as_ref(), self.update_time.as_ref())
    }
}

impl Parent for Notebook {
    type Child = Section;

    fn child_stubs(&self) -> &[Section] {
        &self.sections
    }
}

impl Level for Section {
    type Stub = Section;

    fn resolve(_archive: &QnapArchive, stub: &Section) -> Result<Self> {
        Ok(stub.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn times(&self) -> Timestamps {
        Timestamps::from_raw(self.create_time.as_ref(), self.update_time.as_ref())
    }
}

impl Parent for Section {
    type Child = Note;

    fn child_stubs(&self) -> &[NoteRef] {
        &self.notes
    }
}

impl Level for Note {
    type Stub = NoteRef;

    fn resolve(archive: &QnapArchive, stub: &NoteRef) -> Result<Self> {
        archive.note(&stub.location)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn times(&self) -> Timestamps {
        Timestamps::from_raw(self.create_time.as_ref(), self.update_time.as_ref())
    }
}

impl Parent for Note {
    type Child = Tag;

    fn child_stubs(&self) -> &[Tag] {
        &self.tags
    }
}

impl Level for Tag {
    type Stub = Tag;

    fn resolve(_archive: &QnapArchive, stub: &Tag) -> Result<Self> {
        Ok(stub.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn times(&self) -> Timestamps {
        Timestamps::from_raw(self.create_time.as_ref(), self.update_time.as_ref())
    }
}
