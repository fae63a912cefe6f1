//! File-spool host: renders documents as text and "prints" them into a
//! per-printer spool directory.
//!
//! The template is read once at open time. Non-UTF-8 bytes are replaced, so
//! binary formats still open but carry little substitutable text. Nothing is
//! ever written back to the template.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::{AutomationHost, DocumentId, HostFactory, Protection, Story, StoryKind};
use crate::error::{HostError, HostErrorKind};
use crate::paths::sanitize_filename;

struct SpoolDocument {
    path: PathBuf,
    stories: Vec<Story>,
}

pub struct SpoolHost {
    spool_dir: PathBuf,
    printer: Mutex<Option<String>>,
    documents: Mutex<HashMap<DocumentId, SpoolDocument>>,
    next_doc: AtomicU64,
}

impl SpoolHost {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Result<Self, HostError> {
        let spool_dir = spool_dir.into();
        fs::create_dir_all(&spool_dir).map_err(|e| {
            HostError::unavailable(format!(
                "cannot create spool directory {}: {}",
                spool_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            spool_dir,
            printer: Mutex::new(None),
            documents: Mutex::new(HashMap::new()),
            next_doc: AtomicU64::new(1),
        })
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    fn missing(doc: DocumentId) -> HostError {
        HostError::invalid_document(format!("document {} is not open", doc.0))
    }

    fn render(path: &Path, printer: &str, stories: &[Story]) -> String {
        let mut out = String::new();
        out.push_str(&format!("# template: {}\n", path.display()));
        out.push_str(&format!("# printer: {}\n", printer));
        out.push_str(&format!("# printed: {}\n", Local::now().to_rfc3339()));
        for story in stories {
            out.push_str(&format!("\n[{:?}]\n{}\n", story.kind, story.text));
        }
        out
    }
}

impl AutomationHost for SpoolHost {
    fn open_document(&self, path: &Path) -> Result<DocumentId, HostError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HostError::new(
                HostErrorKind::TemplateNotFound,
                format!("Template not found: {}", path.display()),
            ),
            _ => HostError::invalid_document(format!("cannot read {}: {}", path.display(), e)),
        })?;
        let id = DocumentId(self.next_doc.fetch_add(1, Ordering::SeqCst));
        let text = String::from_utf8_lossy(&bytes).into_owned();
        self.documents.lock().insert(
            id,
            SpoolDocument {
                path: path.to_path_buf(),
                stories: vec![Story {
                    id: 0,
                    kind: StoryKind::MainText,
                    text,
                }],
            },
        );
        debug!(path = %path.display(), doc = id.0, "Opened document for spooling");
        Ok(id)
    }

    fn protection(&self, doc: DocumentId) -> Result<Protection, HostError> {
        if self.documents.lock().contains_key(&doc) {
            Ok(Protection::None)
        } else {
            Err(Self::missing(doc))
        }
    }

    fn unprotect(&self, doc: DocumentId) -> Result<(), HostError> {
        self.protection(doc).map(|_| ())
    }

    fn stories(&self, doc: DocumentId) -> Result<Vec<Story>, HostError> {
        self.documents
            .lock()
            .get(&doc)
            .map(|d| d.stories.clone())
            .ok_or_else(|| Self::missing(doc))
    }

    fn replace_in_story(
        &self,
        doc: DocumentId,
        story: usize,
        find: &str,
        replace: &str,
    ) -> Result<usize, HostError> {
        let mut documents = self.documents.lock();
        let document = documents.get_mut(&doc).ok_or_else(|| Self::missing(doc))?;
        let target = document
            .stories
            .iter_mut()
            .find(|s| s.id == story)
            .ok_or_else(|| HostError::invalid_document(format!("no story {}", story)))?;
        let count = target.text.matches(find).count();
        if count > 0 {
            target.text = target.text.replace(find, replace);
        }
        Ok(count)
    }

    fn set_active_printer(&self, printer: &str) -> Result<(), HostError> {
        *self.printer.lock() = Some(printer.to_string());
        Ok(())
    }

    fn print(&self, doc: DocumentId) -> Result<(), HostError> {
        let printer = self
            .printer
            .lock()
            .clone()
            .ok_or_else(|| HostError::printer("no active printer selected"))?;
        let (path, rendered) = {
            let documents = self.documents.lock();
            let document = documents.get(&doc).ok_or_else(|| Self::missing(doc))?;
            (
                document.path.clone(),
                Self::render(&document.path, &printer, &document.stories),
            )
        };

        let queue = self.spool_dir.join(sanitize_filename(&printer));
        fs::create_dir_all(&queue).map_err(|e| {
            HostError::printer(format!("spool queue {} unavailable: {}", queue.display(), e))
        })?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let job_name = sanitize_filename(&format!(
            "{}-{}-{}.txt",
            Local::now().format("%Y%m%d-%H%M%S"),
            doc.0,
            stem
        ));
        let job = queue.join(job_name);
        fs::write(&job, rendered)
            .map_err(|e| HostError::printer(format!("spool write failed: {}", e)))?;
        info!(job = %job.display(), printer = %printer, "Spooled print job");
        Ok(())
    }

    fn close(&self, doc: DocumentId) -> Result<(), HostError> {
        self.documents
            .lock()
            .remove(&doc)
            .map(|_| ())
            .ok_or_else(|| Self::missing(doc))
    }

    fn force_close(&self, doc: Option<DocumentId>) -> Result<(), HostError> {
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
        self.documents.lock().clear();
        Ok(())
    }
}

/// Connects a fresh [`SpoolHost`] over one spool directory.
#[derive(Debug, Clone)]
pub struct SpoolHostFactory {
    spool_dir: PathBuf,
}

impl SpoolHostFactory {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }
}

impl HostFactory for SpoolHostFactory {
    fn connect(&self) -> Result<Arc<dyn AutomationHost>, HostError> {
        Ok(Arc::new(SpoolHost::new(self.spool_dir.clone())?))
    }

    fn describe(&self) -> String {
        format!("spool host ({})", self.spool_dir.display())
    }
}
