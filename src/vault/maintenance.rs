//! Reconciling the entry store with the ciphertext files on disk.
//!
//! - `cleanup` deletes orphan ciphertexts (files no entry points at).
//! - `prune_entries` drops dangling entries (entries whose file is gone).

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::entries::EntryStore;
use super::format::is_metadata_file;
use crate::errors::Result;

/// Delete every regular file in `dir` that no entry references.
///
/// The metadata file is never touched.  Deletion failures are logged and
/// skipped; only failing to list the directory is an error.  Returns the
/// paths that were selected for removal.
pub fn cleanup(dir: &Path, entries: &EntryStore) -> Result<Vec<PathBuf>> {
    let referenced: HashSet<&OsStr> = entries
        .iter()
        .map(|e| OsStr::new(e.ciphertext_path.as_str()))
        .collect();

    let mut removed = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = match dir_entry {
            Ok(d) => d,
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };

        let name = dir_entry.file_name();
        if is_metadata_file(&name) || referenced.contains(name.as_os_str()) {
            continue;
        }
        match dir_entry.file_type() {
            Ok(t) if t.is_file() => {}
            _ => continue,
        }

        let path = dir_entry.path();
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), "failed to delete orphan ciphertext: {e}");
        } else {
            debug!(path = %path.display(), "deleted orphan ciphertext");
        }
        removed.push(path);
    }

    info!(removed = removed.len(), "cleanup finished");
    Ok(removed)
}

/// Remove every entry whose ciphertext file provably does not exist.
///
/// Only a "not found" stat result marks an entry dangling.  Any other stat
/// error leaves the entry in place.  Invalid indices are collected first
/// and removed highest-first, which keeps the remaining indices valid
/// under swap-remove.  Returns the original names of pruned entries.
pub fn prune_entries(dir: &Path, entries: &mut EntryStore) -> Vec<String> {
    let mut dangling = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let path = dir.join(&entry.ciphertext_path);
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => dangling.push(idx),
            Err(e) => {
                warn!(
                    entry = %entry.original_name,
                    "cannot confirm ciphertext is missing, keeping entry: {e}"
                );
            }
        }
    }

    let mut pruned = Vec::with_capacity(dangling.len());
    for idx in dangling.into_iter().rev() {
        if let Some(entry) = entries.remove_at(idx) {
            debug!(entry = %entry.original_name, "pruned dangling entry");
            pruned.push(entry.original_name);
        }
    }

    info!(pruned = pruned.len(), "prune finished");
    pruned
}
