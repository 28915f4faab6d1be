//! Classify a previously installed file set against a new one.
//!
//! Pure and total: any two sets (including empty ones) produce a result, and
//! the output order always follows the old set, so repeated calls agree.

use std::collections::HashMap;

use crate::manifest::{FileEntry, FileKey, FileSet};

/// Classification of the old set's entries relative to the new set.
///
/// Entries present only in the new set are the implicit "added" class; see
/// [`added`] and [`DiffResult::download_set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Key in both sets, hash differs. Holds the new entry.
    pub changed: FileSet,
    /// Key only in the old set.
    pub removed: FileSet,
    /// Key and hash match. Holds the old entry.
    pub unchanged: FileSet,
}

impl DiffResult {
    /// New entries that still need downloading: `new - unchanged`, in `new` order.
    pub fn download_set(&self, new: &FileSet) -> FileSet {
        new.without(&self.unchanged)
    }

    /// Entries whose local copy must be deleted before downloading.
    pub fn to_prune(&self) -> impl Iterator<Item = &FileEntry> {
        self.changed.iter().chain(self.removed.iter())
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

pub fn diff(old: &FileSet, new: &FileSet) -> DiffResult {
    let by_key: HashMap<FileKey, &FileEntry> = new.iter().map(|e| (e.key(), e)).collect();

    let mut changed = Vec::new();
    let mut removed = Vec::new();
    let mut unchanged = Vec::new();
    for entry in old {
        match by_key.get(&entry.key()) {
            None => removed.push(entry.clone()),
            Some(next) if next.same_content(entry) => unchanged.push(entry.clone()),
            Some(next) => changed.push((*next).clone()),
        }
    }

    DiffResult {
        changed: FileSet::from_entries(changed),
        removed: FileSet::from_entries(removed),
        unchanged: FileSet::from_entries(unchanged),
    }
}

/// Entries present only in `new`.
pub fn added(new: &FileSet, result: &DiffResult) -> FileSet {
    new.without(&result.unchanged).without(&result.changed)
}
