//! Locating the tmux binary.
//!
//! Platform candidates are checked in order, then every `PATH` entry.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TmuxError;

#[cfg(target_os = "macos")]
const CANDIDATE_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

#[cfg(not(target_os = "macos"))]
const CANDIDATE_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/bin", "/snap/bin"];

/// Platform-specific places tmux is usually installed.
#[must_use]
pub fn candidate_paths() -> Vec<PathBuf> {
    CANDIDATE_DIRS
        .iter()
        .map(|dir| Path::new(dir).join("tmux"))
        .collect()
}

/// Find tmux, honouring an explicit override first.
///
/// # Errors
///
/// Returns [`TmuxError::BinaryNotFound`] listing every location tried.
pub fn locate_tmux(override_path: Option<&Path>) -> Result<PathBuf, TmuxError> {
    if let Some(path) = override_path {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(TmuxError::BinaryNotFound {
                searched: vec![path.to_path_buf()],
            })
        };
    }

    let candidates = candidate_paths();
    let path_var = std::env::var_os("PATH");
    locate_in(&candidates, path_var.as_deref(), "tmux").ok_or(TmuxError::BinaryNotFound {
        searched: candidates,
    })
}

fn locate_in(candidates: &[PathBuf], path_var: Option<&OsStr>, name: &str) -> Option<PathBuf> {
    if let Some(found) = candidates.iter().find(|c| c.is_file()) {
        debug!(path = %found.display(), "found tmux at platform location");
        return Some(found.clone());
    }

    let found = std::env::split_paths(path_var?)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())?;
    debug!(path = %found.display(), "found tmux on PATH");
    Some(found)
}
