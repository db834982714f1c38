//! Whole-file writes through a temporary sibling

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Write content to a file, creating missing parent directories.
///
/// Content goes to a temporary file in the same directory which is then
/// renamed over the target, so readers see either the old or the new
/// content in full. Concurrent writers to one path race; the last rename
/// wins.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(path);
    let result = write_then_rename(&temp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    drop(temp_file);

    fs::rename(temp_path, path).map_err(|e| Error::io(path, e))
}

// Unique per process and per call so parallel writers never share a temp file
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        sequence
    ))
}

/// Whether `name` is a temporary file left in flight by [`write_atomic`].
///
/// Matches `.<name>.<pid>.<seq>.tmp` only, so ordinary dotfiles ending in
/// `.tmp` are not mistaken for one.
pub fn is_temp_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".tmp") else {
        return false;
    };
    let mut parts = stem.rsplitn(3, '.');
    let numeric = |part: Option<&str>| {
        part.is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    };
    numeric(parts.next())
        && numeric(parts.next())
        && parts.next().is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}
