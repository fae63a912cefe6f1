//! Template catalog: maps template ids to `.docx` files inside a shift folder.
//!
//! Folder listings are cached per canonical folder and refreshed once when a
//! lookup misses, so templates added while the program runs are still found.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use crate::error::AutomationError;
use crate::paths::{validate_folder_path, PathValidationError};
use crate::types::TemplateId;

pub const TEMPLATE_EXTENSION: &str = "docx";

const ROTATION_MARKER: &str = "third";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateLookupError {
    #[error("Invalid template folder: {0}")]
    InvalidFolder(#[from] PathValidationError),

    #[error("Template not found: {template} in {folder}")]
    NotFound { template: String, folder: String },

    #[error("Ambiguous template matches for '{template}'; rename templates to be unique. Matches: {}", matches.join(", "))]
    Ambiguous {
        template: String,
        matches: Vec<String>,
    },

    #[error("Error listing files in {folder}: {reason}")]
    Unreadable { folder: String, reason: String },
}

impl From<TemplateLookupError> for AutomationError {
    fn from(err: TemplateLookupError) -> Self {
        AutomationError::Document(err.to_string())
    }
}

/// Lower-case, NFC, whitespace collapsed.
pub fn normalise_name(name: &str) -> String {
    let composed: String = name.nfc().collect();
    composed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_template_file(name: &str) -> bool {
    if name.starts_with("~$") || name.starts_with('.') {
        return false;
    }
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(TEMPLATE_EXTENSION))
        .unwrap_or(false)
}

/// Normalised stem to file path, for one folder.
type Listing = BTreeMap<String, PathBuf>;

fn scan(folder: &Path) -> Result<Listing, TemplateLookupError> {
    let mut listing = Listing::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| TemplateLookupError::Unreadable {
            folder: folder.display().to_string(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_template_file(&name) {
            continue;
        }
        let stem = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        listing.insert(normalise_name(&stem), entry.path().to_path_buf());
    }
    Ok(listing)
}

/// Count template files directly inside `folder`.
pub fn count_templates(folder: &Path) -> Result<usize, TemplateLookupError> {
    scan(folder).map(|listing| listing.len())
}

#[derive(Debug, Default)]
pub struct TemplateCatalog {
    cache: Mutex<HashMap<PathBuf, Listing>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached listings, for one folder or all of them.
    pub fn clear(&self, folder: Option<&Path>) {
        let mut cache = self.cache.lock();
        match folder {
            Some(folder) => {
                if let Ok(canonical) = dunce::canonicalize(folder) {
                    cache.remove(&canonical);
                }
            }
            None => cache.clear(),
        }
    }

    fn listing(&self, folder: &Path, refresh: bool) -> Result<Listing, TemplateLookupError> {
        if !refresh {
            if let Some(listing) = self.cache.lock().get(folder) {
                return Ok(listing.clone());
            }
        }
        let listing = scan(folder)?;
        debug!(folder = %folder.display(), templates = listing.len(), "Cached template listing");
        self.cache
            .lock()
            .insert(folder.to_path_buf(), listing.clone());
        Ok(listing)
    }

    /// Find the file for `template` inside `folder`.
    pub fn resolve(&self, folder: &Path, template: &TemplateId) -> Result<PathBuf, TemplateLookupError> {
        let folder = validate_folder_path(folder)?;
        let wanted = normalise_name(template.as_str());
        let had_cache = self.cache.lock().contains_key(&folder);

        let mut listing = self.listing(&folder, false)?;
        if let Some(path) = match_template(&wanted, template, &listing)? {
            return Ok(path);
        }
        if had_cache {
            debug!(folder = %folder.display(), "Template not found; refreshing listing");
            listing = self.listing(&folder, true)?;
            if let Some(path) = match_template(&wanted, template, &listing)? {
                return Ok(path);
            }
        }

        warn!(template = %template, folder = %folder.display(), "Template not found");
        Err(TemplateLookupError::NotFound {
            template: template.to_string(),
            folder: folder.display().to_string(),
        })
    }
}

fn match_template(
    wanted: &str,
    template: &TemplateId,
    listing: &Listing,
) -> Result<Option<PathBuf>, TemplateLookupError> {
    if let Some(path) = listing.get(wanted) {
        debug!(template = %template, path = %path.display(), "Template exact match");
        return Ok(Some(path.clone()));
    }

    let pattern = match Regex::new(&format!(r"\b{}\b", regex::escape(wanted))) {
        Ok(pattern) => pattern,
        Err(_) => return Ok(None),
    };
    let wants_rotation = wanted.contains(ROTATION_MARKER);
    let matches: Vec<(&String, &PathBuf)> = listing
        .iter()
        .filter(|(name, _)| pattern.is_match(name))
        .filter(|(name, _)| wants_rotation || !name.contains(ROTATION_MARKER))
        .collect();

    match matches.as_slice() {
        [] => Ok(None),
        [(_, path)] => {
            info!(template = %template, path = %path.display(), "Found template by word match");
            Ok(Some((*path).clone()))
        }
        _ => {
            let prefixed: Vec<&PathBuf> = matches
                .iter()
                .filter(|(name, _)| name.starts_with(wanted))
                .map(|(_, path)| *path)
                .collect();
            if let [path] = prefixed.as_slice() {
                info!(template = %template, path = %path.display(), "Found template by prefix among several");
                return Ok(Some((*path).clone()));
            }
            Err(TemplateLookupError::Ambiguous {
                template: template.to_string(),
                matches: matches
                    .iter()
                    .map(|(_, path)| path.display().to_string())
                    .collect(),
            })
        }
    }
}
