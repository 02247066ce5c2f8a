//! Import QNAP Notes Station archives (`.ns3`) into Joplin.
//!
//! [`qnap`] reads the archive, [`markdown`] renders note documents,
//! [`store`] writes to the destination and [`import`] ties them together.

pub mod config;
pub mod import;
pub mod markdown;
pub mod qnap;
pub mod store;
