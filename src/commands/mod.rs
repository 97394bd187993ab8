//! Command handlers module.
//!
//! - `io.rs`: import, preview, and export against a SQLite catalog

mod io;

pub use io::{cmd_export, cmd_import, cmd_preview};
