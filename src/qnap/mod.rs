//! QNAP Notes Station archive access
//!
//! Reads `.ns3` exports: the `data.json` manifest (notebooks, sections and
//! note locations), per-note `noteInfo.json` records and the image and
//! attachment files stored below each note location.

mod archive;
pub mod content;
mod errors;
mod models;
mod walker;

pub use archive::*;
pub use content::Document;
pub use errors::{QnapError, Result};
pub use models::*;
pub use walker::{Level, Parent, Walk};
