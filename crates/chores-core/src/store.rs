//! Line-delimited JSON storage for the active and archive record sets.
//!
//! # Layout
//!
//! ```text
//! .chores/
//!   chores.jsonl            # active store, rewritten whole on every commit
//!   chores_completed.jsonl  # archive store, append-only
//!   config.toml
//! ```
//!
//! # Invariants
//!
//! - The active store is replaced by writing a sibling temp file and renaming
//!   it over the original, so a reader never sees a half-written file.
//! - The archive store only grows; each append is `O_APPEND` + `write_all` +
//!   `flush`.
//! - Blank lines are ignored on read. Any other unparsable line is an error
//!   carrying its 1-based line number.

use std::fs::{self, OpenOptions};
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ErrorCode;
use crate::model::ChoreRecord;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from reading or writing the store files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt record at {}:{line}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode chore {id}: {source}")]
    Encode {
        id: crate::model::ChoreId,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Encode { .. } => ErrorCode::StoreWriteFailed,
            Self::Parse { .. } => ErrorCode::StoreCorrupt,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// ChoreStore
// ---------------------------------------------------------------------------

/// The pair of store files backing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoreStore {
    active_path: PathBuf,
    archive_path: PathBuf,
}

impl ChoreStore {
    #[must_use]
    pub const fn new(active_path: PathBuf, archive_path: PathBuf) -> Self {
        Self {
            active_path,
            archive_path,
        }
    }

    /// Store whose archive path is derived from the active path.
    #[must_use]
    pub fn from_active(active_path: impl Into<PathBuf>) -> Self {
        let active_path = active_path.into();
        let archive_path = Self::archive_path_for(&active_path);
        Self::new(active_path, archive_path)
    }

    /// `chores.jsonl` becomes `chores_completed.jsonl`; any other name gets
    /// `_completed` appended.
    #[must_use]
    pub fn archive_path_for(active: &Path) -> PathBuf {
        let raw = active.as_os_str().to_string_lossy();
        raw.strip_suffix(".jsonl").map_or_else(
            || PathBuf::from(format!("{raw}_completed")),
            |stem| PathBuf::from(format!("{stem}_completed.jsonl")),
        )
    }

    #[must_use]
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Read every record in the active store. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Parse`].
    pub fn read_active(&self) -> Result<Vec<ChoreRecord>, StoreError> {
        read_records(&self.active_path)
    }

    /// Read every record in the archive store. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Parse`].
    pub fn read_archive(&self) -> Result<Vec<ChoreRecord>, StoreError> {
        read_records(&self.archive_path)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Append one record to the archive store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on write failure.
    pub fn append_archive(&self, record: &ChoreRecord) -> Result<(), StoreError> {
        let line = encode_line(record)?;
        ensure_parent(&self.archive_path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.archive_path)
            .map_err(|e| StoreError::io(&self.archive_path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StoreError::io(&self.archive_path, e))?;

        debug!(id = %record.id, path = %self.archive_path.display(), "appended to archive");
        Ok(())
    }

    /// Replace the active store with exactly `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the temp file cannot be written or moved
    /// into place.
    pub fn rewrite_active<'a, I>(&self, records: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a ChoreRecord>,
    {
        let mut body = String::new();
        let mut count = 0_usize;
        for record in records {
            body.push_str(&encode_line(record)?);
            count += 1;
        }

        ensure_parent(&self.active_path)?;
        let tmp_path = tmp_path_for(&self.active_path);
        fs::write(&tmp_path, body).map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.active_path)
            .map_err(|e| StoreError::io(&self.active_path, e))?;

        debug!(count, path = %self.active_path.display(), "rewrote active store");
        Ok(())
    }
}

fn read_records(path: &Path) -> Result<Vec<ChoreRecord>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })
        })
        .collect()
}

fn encode_line(record: &ChoreRecord) -> Result<String, StoreError> {
    let mut line = serde_json::to_string(record).map_err(|source| StoreError::Encode {
        id: record.id,
        source,
    })?;
    line.push('\n');
    Ok(line)
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".tmp");
    PathBuf::from(raw)
}
