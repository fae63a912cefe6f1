//! Shift Automator: batch printing of recurring shift-schedule documents
//!
//! Drives a document-automation host through a guarded, retrying batch: one
//! document per date and shift, date fields rewritten, printed, and closed
//! without saving.

pub mod batch;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod host;
pub mod logging;
pub mod paths;
pub mod retry;
pub mod schedule;
pub mod session;
pub mod templates;
pub mod types;
