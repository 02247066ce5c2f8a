//! Markdown rendering of QNAP note documents

mod export;

pub use export::*;
