//! QNAP → Joplin import
//!
//! Walks the archive depth first (notebook → section → note → tag), writes
//! notebooks and sections as folders, converts every note to Markdown and
//! uploads referenced images and attachments on the way.

mod importer;
mod resources;

pub use importer::*;
pub use resources::{ResourceBridge, PLACEHOLDER_RESOURCE_ID};
