//! Path validation and filename sanitisation.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const MAX_FILENAME_LENGTH: usize = 255;

const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathValidationError {
    #[error("Path cannot be empty")]
    Empty,

    #[error("Path does not exist: {0}")]
    NotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Path is not readable: {0}")]
    Unreadable(String),
}

/// Check that `path` is an existing, readable directory; returns its
/// canonical form.
pub fn validate_folder_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    if path.as_os_str().is_empty() {
        return Err(PathValidationError::Empty);
    }
    let display = path.display().to_string();
    let canonical = dunce::canonicalize(path)
        .map_err(|_| PathValidationError::NotFound(display.clone()))?;
    if !canonical.is_dir() {
        return Err(PathValidationError::NotADirectory(display));
    }
    fs::read_dir(&canonical).map_err(|_| PathValidationError::Unreadable(display))?;
    debug!(path = %canonical.display(), "Validated folder path");
    Ok(canonical)
}

/// Whether `candidate` lies inside (or is) `base`.
///
/// Both paths are canonicalised first. A path that does not exist, or cannot
/// be canonicalised, is never within base.
pub fn is_within_base(candidate: &Path, base: &Path) -> bool {
    let (Ok(candidate), Ok(base)) = (dunce::canonicalize(candidate), dunce::canonicalize(base))
    else {
        return false;
    };
    candidate.starts_with(&base)
}

/// Make `name` safe to use as a single file name on any platform.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut sanitized = replaced.trim_matches(|c| c == '.' || c == ' ').to_string();
    if sanitized.is_empty() {
        sanitized = "_unnamed".to_string();
    }

    let stem = sanitized
        .split('.')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if WINDOWS_RESERVED_NAMES.contains(&stem.as_str()) {
        sanitized = format!("_{}", sanitized);
    }

    if sanitized.chars().count() > MAX_FILENAME_LENGTH {
        sanitized = match sanitized.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let keep = MAX_FILENAME_LENGTH.saturating_sub(ext.chars().count() + 1);
                let stem: String = stem.chars().take(keep).collect();
                format!("{}.{}", stem, ext)
            }
            _ => sanitized.chars().take(MAX_FILENAME_LENGTH).collect(),
        };
    }

    sanitized
}
