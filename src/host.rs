//! Automation host boundary.
//!
//! The host is an external, synchronous, non-reentrant document application. Each
//! trait method is one call into it. Nothing in the engine calls these methods
//! directly: every call is routed through [`crate::guard::GuardedExecutor`] by the
//! document session and the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::HostError;

mod simulated;
mod spool;

pub use simulated::{
    CallCounts, HostCall, PrintedDocument, ScriptedFailure, SimulatedHost, SimulatedHostFactory,
};
pub use spool::{SpoolHost, SpoolHostFactory};

/// Handle of a document open in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

/// Where a piece of document text lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryKind {
    MainText,
    PrimaryHeader,
    FirstPageHeader,
    EvenPagesHeader,
    PrimaryFooter,
    FirstPageFooter,
    EvenPagesFooter,
    Other,
}

impl StoryKind {
    pub fn is_header_or_footer(self) -> bool {
        matches!(
            self,
            StoryKind::PrimaryHeader
                | StoryKind::FirstPageHeader
                | StoryKind::EvenPagesHeader
                | StoryKind::PrimaryFooter
                | StoryKind::FirstPageFooter
                | StoryKind::EvenPagesFooter
        )
    }
}

/// One text story of an open document, as read from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// Host-assigned index, stable while the document is open
    pub id: usize,
    pub kind: StoryKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protection {
    None,
    ReadOnly,
    AllowComments,
    AllowRevisions,
}

/// Call-by-call interface to the document host.
///
/// There is intentionally no save operation: templates are printed from the
/// live in-memory document and are never written back.
pub trait AutomationHost: Send + Sync {
    fn open_document(&self, path: &Path) -> Result<DocumentId, HostError>;

    fn protection(&self, doc: DocumentId) -> Result<Protection, HostError>;

    fn unprotect(&self, doc: DocumentId) -> Result<(), HostError>;

    fn stories(&self, doc: DocumentId) -> Result<Vec<Story>, HostError>;

    /// Replace every literal occurrence of `find` in one story. Returns the
    /// number of replacements made.
    fn replace_in_story(
        &self,
        doc: DocumentId,
        story: usize,
        find: &str,
        replace: &str,
    ) -> Result<usize, HostError>;

    fn set_active_printer(&self, printer: &str) -> Result<(), HostError>;

    /// Print synchronously; returns once the job is handed to the spooler.
    fn print(&self, doc: DocumentId) -> Result<(), HostError>;

    /// Close without saving.
    fn close(&self, doc: DocumentId) -> Result<(), HostError>;

    /// Close without saving, tolerating a half-opened document. `None` closes
    /// whatever document the host still holds.
    fn force_close(&self, doc: Option<DocumentId>) -> Result<(), HostError>;

    fn shutdown(&self) -> Result<(), HostError>;
}

/// Starts fresh host instances.
pub trait HostFactory: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn AutomationHost>, HostError>;

    fn describe(&self) -> String;
}
