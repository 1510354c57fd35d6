//! koboswitch library - Move a Kobo e-reader to another account without losing its library.
//!
//! This library exposes the core functionality of the `koboswitch` CLI for use
//! in tests and potentially other applications.
//!
//! # Modules
//!
//! - `replicate`: Recursive tree copy with ignore patterns and a pluggable file copier
//! - `database`: Access to the device metadata database and the account-row merge
//! - `workflow`: The confirmation-gated backup, wipe, restore and merge sequence
//! - `layout`: Paths inside the device and backup roots
//! - `error`: Error types with user-recoverable hints
//! - `output`: Output mode abstraction (robot/human)
//! - `config`: Configuration file handling
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod layout;
pub mod logging;
pub mod output;
pub mod replicate;
pub mod theme;
pub mod workflow;
