pub mod import;
pub mod preview;
pub mod probe;
pub mod show;
