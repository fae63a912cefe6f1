//! In-memory host with scriptable failures, delays and hangs.
//!
//! Every instance created by one [`SimulatedHostFactory`] shares a script and a
//! set of counters, so a test can observe a whole batch including host restarts.
//! Each instance also tracks how many calls are inside it at once and records a
//! violation whenever that exceeds one.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{AutomationHost, DocumentId, HostFactory, Protection, Story, StoryKind};
use crate::error::{HostError, HostErrorKind};

/// Host operations a script can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    Connect,
    Open,
    Protection,
    Unprotect,
    Stories,
    Replace,
    SetPrinter,
    Print,
    Close,
    ForceClose,
    Shutdown,
}

/// What the next scripted call of a kind does instead of succeeding normally.
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    Fail(HostError),
    /// Block for the duration, then behave normally
    Hang(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub connects: usize,
    pub opens: usize,
    pub closes: usize,
    pub force_closes: usize,
    pub prints: usize,
    pub replaces: usize,
    pub shutdowns: usize,
    /// Calls that entered an instance while another call was inside it
    pub concurrent_entries: usize,
}

impl CallCounts {
    /// Calls that issued any host interaction at all.
    pub fn total_document_calls(&self) -> usize {
        self.opens + self.closes + self.force_closes + self.prints + self.replaces
    }
}

/// A document the simulated printer received.
#[derive(Debug, Clone)]
pub struct PrintedDocument {
    pub path: PathBuf,
    pub printer: Option<String>,
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone)]
struct SimDocument {
    path: PathBuf,
    stories: Vec<Story>,
    protection: Protection,
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<HostCall, VecDeque<ScriptedFailure>>>,
    path_failures: Mutex<Vec<(String, HostError)>>,
    contents: Mutex<Vec<(String, Vec<Story>)>>,
    protected_paths: Mutex<Vec<String>>,
    counts: Mutex<CallCounts>,
    printed: Mutex<Vec<PrintedDocument>>,
    next_doc: AtomicU64,
}

impl Shared {
    fn take_script(&self, call: HostCall) -> Option<ScriptedFailure> {
        self.scripts.lock().get_mut(&call).and_then(|q| q.pop_front())
    }

    /// Apply the next scripted behaviour for `call`. Hangs sleep here.
    fn run_script(&self, call: HostCall) -> Result<(), HostError> {
        match self.take_script(call) {
            Some(ScriptedFailure::Fail(error)) => Err(error),
            Some(ScriptedFailure::Hang(duration)) => {
                thread::sleep(duration);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn default_stories() -> Vec<Story> {
        vec![
            Story {
                id: 0,
                kind: StoryKind::MainText,
                text: "Shift roster for January 04, 2026. Posted 01/04/2026.".to_string(),
            },
            Story {
                id: 1,
                kind: StoryKind::PrimaryHeader,
                text: "Sunday, January 04, 2026".to_string(),
            },
        ]
    }

    fn stories_for(&self, path: &Path) -> Vec<Story> {
        let name = path.to_string_lossy();
        self.contents
            .lock()
            .iter()
            .find(|(fragment, _)| name.contains(fragment.as_str()))
            .map(|(_, stories)| stories.clone())
            .unwrap_or_else(Self::default_stories)
    }
}

/// Builds [`SimulatedHost`] instances that share one script and counters.
#[derive(Clone, Default)]
pub struct SimulatedHostFactory {
    shared: Arc<Shared>,
}

impl SimulatedHostFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue behaviours for successive calls of `call`; later calls succeed.
    pub fn script<I>(&self, call: HostCall, behaviours: I) -> &Self
    where
        I: IntoIterator<Item = ScriptedFailure>,
    {
        self.shared
            .scripts
            .lock()
            .entry(call)
            .or_default()
            .extend(behaviours);
        self
    }

    /// Every open of a path containing `fragment` fails with `error`.
    pub fn fail_open_for(&self, fragment: impl Into<String>, error: HostError) -> &Self {
        self.shared.path_failures.lock().push((fragment.into(), error));
        self
    }

    /// Documents whose path contains `fragment` open with these stories.
    pub fn with_content(&self, fragment: impl Into<String>, stories: Vec<Story>) -> &Self {
        self.shared.contents.lock().push((fragment.into(), stories));
        self
    }

    /// Documents whose path contains `fragment` open read-only protected.
    pub fn protect(&self, fragment: impl Into<String>) -> &Self {
        self.shared.protected_paths.lock().push(fragment.into());
        self
    }

    pub fn counts(&self) -> CallCounts {
        *self.shared.counts.lock()
    }

    pub fn printed(&self) -> Vec<PrintedDocument> {
        self.shared.printed.lock().clone()
    }

    /// A standalone instance using this factory's script and counters.
    pub fn instance(&self) -> SimulatedHost {
        SimulatedHost {
            shared: Arc::clone(&self.shared),
            active: AtomicUsize::new(0),
            documents: Mutex::new(HashMap::new()),
            printer: Mutex::new(None),
        }
    }
}

impl HostFactory for SimulatedHostFactory {
    fn connect(&self) -> Result<Arc<dyn AutomationHost>, HostError> {
        self.shared.counts.lock().connects += 1;
        self.shared.run_script(HostCall::Connect)?;
        Ok(Arc::new(self.instance()))
    }

    fn describe(&self) -> String {
        "simulated host".to_string()
    }
}

/// One simulated host instance.
pub struct SimulatedHost {
    shared: Arc<Shared>,
    active: AtomicUsize,
    documents: Mutex<HashMap<DocumentId, SimDocument>>,
    printer: Mutex<Option<String>>,
}

/// Tracks one call inside an instance.
struct Entry<'a>(&'a SimulatedHost);

impl<'a> Entry<'a> {
    fn enter(host: &'a SimulatedHost) -> Self {
        if host.active.fetch_add(1, Ordering::SeqCst) > 0 {
            host.shared.counts.lock().concurrent_entries += 1;
        }
        Entry(host)
    }
}

impl Drop for Entry<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedHost {
    pub fn open_documents(&self) -> usize {
        self.documents.lock().len()
    }

    fn with_document<T>(
        &self,
        doc: DocumentId,
        f: impl FnOnce(&mut SimDocument) -> T,
    ) -> Result<T, HostError> {
        let mut documents = self.documents.lock();
        let document = documents.get_mut(&doc).ok_or_else(|| {
            HostError::invalid_document(format!("document {} is not open", doc.0))
        })?;
        Ok(f(document))
    }
}

impl AutomationHost for SimulatedHost {
    fn open_document(&self, path: &Path) -> Result<DocumentId, HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().opens += 1;
        self.shared.run_script(HostCall::Open)?;

        let name = path.to_string_lossy().to_string();
        if let Some((_, error)) = self
            .shared
            .path_failures
            .lock()
            .iter()
            .find(|(fragment, _)| name.contains(fragment.as_str()))
        {
            return Err(error.clone());
        }

        let protection = if self
            .shared
            .protected_paths
            .lock()
            .iter()
            .any(|fragment| name.contains(fragment.as_str()))
        {
            Protection::ReadOnly
        } else {
            Protection::None
        };

        let id = DocumentId(self.shared.next_doc.fetch_add(1, Ordering::SeqCst) + 1);
        self.documents.lock().insert(
            id,
            SimDocument {
                path: path.to_path_buf(),
                stories: self.shared.stories_for(path),
                protection,
            },
        );
        Ok(id)
    }

    fn protection(&self, doc: DocumentId) -> Result<Protection, HostError> {
        let _entry = Entry::enter(self);
        self.shared.run_script(HostCall::Protection)?;
        self.with_document(doc, |d| d.protection)
    }

    fn unprotect(&self, doc: DocumentId) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.run_script(HostCall::Unprotect)?;
        self.with_document(doc, |d| d.protection = Protection::None)
    }

    fn stories(&self, doc: DocumentId) -> Result<Vec<Story>, HostError> {
        let _entry = Entry::enter(self);
        self.shared.run_script(HostCall::Stories)?;
        self.with_document(doc, |d| d.stories.clone())
    }

    fn replace_in_story(
        &self,
        doc: DocumentId,
        story: usize,
        find: &str,
        replace: &str,
    ) -> Result<usize, HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().replaces += 1;
        self.shared.run_script(HostCall::Replace)?;
        self.with_document(doc, |d| {
            if d.protection != Protection::None {
                return Err(HostError::new(
                    HostErrorKind::Protected,
                    "document is protected",
                ));
            }
            let target = d
                .stories
                .iter_mut()
                .find(|s| s.id == story)
                .ok_or_else(|| HostError::invalid_document(format!("no story {}", story)))?;
            let count = target.text.matches(find).count();
            if count > 0 {
                target.text = target.text.replace(find, replace);
            }
            Ok(count)
        })?
    }

    fn set_active_printer(&self, printer: &str) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.run_script(HostCall::SetPrinter)?;
        *self.printer.lock() = Some(printer.to_string());
        Ok(())
    }

    fn print(&self, doc: DocumentId) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().prints += 1;
        self.shared.run_script(HostCall::Print)?;
        let (path, stories) = self.with_document(doc, |d| (d.path.clone(), d.stories.clone()))?;
        self.shared.printed.lock().push(PrintedDocument {
            path,
            printer: self.printer.lock().clone(),
            stories,
        });
        Ok(())
    }

    fn close(&self, doc: DocumentId) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().closes += 1;
        self.shared.run_script(HostCall::Close)?;
        self.documents.lock().remove(&doc);
        Ok(())
    }

    fn force_close(&self, doc: Option<DocumentId>) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().force_closes += 1;
        self.shared.run_script(HostCall::ForceClose)?;
        let mut documents = self.documents.lock();
        match doc {
            Some(id) => {
                documents.remove(&id);
            }
            None => documents.clear(),
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), HostError> {
        let _entry = Entry::enter(self);
        self.shared.counts.lock().shutdowns += 1;
        self.shared.run_script(HostCall::Shutdown)?;
        self.documents.lock().clear();
        Ok(())
    }
}
