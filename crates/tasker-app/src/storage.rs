//! JSON state file holding the whole task book.
//!
//! The document is rewritten in full on every save. Writes go to a temporary
//! file in the target directory which is then renamed over the old file, so a
//! crash never leaves a half-written state behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tasker_core::{Tag, Task, TaskList};
use tempfile::NamedTempFile;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::app_state::AppState;
use crate::task_book::TaskBook;

/// Format version written by this build.
pub const STATE_VERSION: u32 = 1;

/// Errors raised while reading or writing the state file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The document could not be (de)serialized.
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),
    /// The temporary file could not replace the state file.
    #[error("failed to replace state file: {0}")]
    Persist(#[from] tempfile::PersistError),
    /// The document was written by a newer build.
    #[error("state version {found} is newer than supported version {supported}", supported = STATE_VERSION)]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
    },
}

/// Serialized form of a [`TaskBook`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Format version.
    pub version: u32,
    /// Every task, subtasks included.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Lists.
    #[serde(default)]
    pub lists: Vec<TaskList>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// View state.
    #[serde(default)]
    pub app: AppState,
}

impl StateDocument {
    /// Snapshot a book.
    #[must_use]
    pub fn from_book(book: &TaskBook) -> Self {
        Self {
            version: STATE_VERSION,
            tasks: book.tasks().cloned().collect(),
            lists: book.lists().to_vec(),
            tags: book.tags().to_vec(),
            app: book.app().clone(),
        }
    }

    /// Rebuild the book, repairing links and filling empty registries.
    #[must_use]
    pub fn into_book(self, now: OffsetDateTime) -> TaskBook {
        TaskBook::from_parts(self.tasks, self.lists, self.tags, self.app, now)
    }

    /// Parse a document.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or an unsupported version.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let document: Self = serde_json::from_str(json)?;
        if document.version > STATE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: document.version,
            });
        }
        Ok(document)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document from disk.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, StorageError> {
        let contents = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }
}

/// Location of the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Wrap a path. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the book, or a fresh default book when the file does not exist.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(&self, now: OffsetDateTime) -> Result<TaskBook, StorageError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "State file missing, starting fresh");
            return Ok(TaskBook::with_defaults(now));
        }
        let document = StateDocument::read(&self.path)?;
        debug!(
            path = %self.path.display(),
            version = document.version,
            tasks = document.tasks.len(),
            "Loaded state file"
        );
        Ok(document.into_book(now))
    }

    /// Atomically write the book.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or the file cannot be written.
    pub fn save(&self, book: &TaskBook) -> Result<(), StorageError> {
        self.write_document(&StateDocument::from_book(book))
    }

    /// Atomically write a document.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or the file cannot be written.
    pub fn write_document(&self, document: &StateDocument) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_err = |source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let json = document.to_json()?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path)?;
        debug!(path = %self.path.display(), tasks = document.tasks.len(), "Saved state file");
        Ok(())
    }
}
