use thiserror::Error;

/// Errors raised while reading a QNAP Notes Station archive
#[derive(Error, Debug)]
pub enum QnapError {
    #[error("Archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("Malformed note content: {0}")]
    MalformedContent(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QnapError>;
