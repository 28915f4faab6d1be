//! File entries, file sets and the installed-manifest record.
//!
//! The JSON shape matches what the modpack catalog publishes per file
//! (`name`, `path`, `url`, `mirrors`, `hash`, `hash_type`) so a version
//! listing can be persisted as-is.

mod path;
mod persist;

pub use path::{destination_path, normalized_dir, UnsafePath};
pub use persist::{manifest_path, read_manifest, read_manifest_file, write_manifest, MANIFEST_NAME};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::checksum::{self, HashAlgorithm};
use crate::error::TransferError;

/// One remote file of a modpack version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Directory relative to the install dir (empty = install dir itself).
    #[serde(rename = "path", default)]
    pub relative_path: String,
    #[serde(rename = "url")]
    pub primary_url: String,
    #[serde(rename = "mirrors", default, deserialize_with = "null_as_empty")]
    pub mirror_urls: Vec<String>,
    #[serde(rename = "hash", default)]
    pub content_hash: String,
    /// `sha1`, `sha256` or empty for "do not verify".
    #[serde(rename = "hash_type", default)]
    pub hash_type: String,
}

/// Identity of a file inside an installation: `(name, relative_path)`, with the
/// directory in [`normalized_dir`] form so `./mods/` and `mods` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey {
    pub name: String,
    pub relative_path: String,
}

impl FileEntry {
    pub fn new(
        name: impl Into<String>,
        relative_path: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            primary_url: url.into(),
            mirror_urls: Vec::new(),
            content_hash: String::new(),
            hash_type: String::new(),
        }
    }

    pub fn with_hash(mut self, algorithm: HashAlgorithm, hex: impl Into<String>) -> Self {
        self.hash_type = algorithm.as_str().to_string();
        self.content_hash = hex.into();
        self
    }

    pub fn with_mirrors<I, S>(mut self, mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mirror_urls = mirrors.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> FileKey {
        FileKey {
            name: self.name.clone(),
            relative_path: normalized_dir(&self.relative_path),
        }
    }

    /// Algorithm to verify with, `None` when the entry carries no usable hash.
    pub fn algorithm(&self) -> Result<Option<HashAlgorithm>, TransferError> {
        if self.content_hash.trim().is_empty() {
            return Ok(None);
        }
        HashAlgorithm::parse(&self.hash_type)
    }

    /// Same content as `other` according to the published hashes.
    pub fn same_content(&self, other: &FileEntry) -> bool {
        checksum::hex_eq(&self.content_hash, &other.content_hash)
            && self.hash_type.trim().eq_ignore_ascii_case(other.hash_type.trim())
    }

    /// `relative_path/name` with forward slashes, for logs and error messages.
    pub fn display_path(&self) -> String {
        let dir = normalized_dir(&self.relative_path);
        if dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", dir, self.name)
        }
    }

    /// Primary URL followed by mirrors, in the order they are tried.
    pub fn candidate_urls(&self) -> Vec<String> {
        std::iter::once(&self.primary_url)
            .chain(self.mirror_urls.iter())
            .filter(|u| !u.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// Ordered list of file entries with unique identity keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FileEntry>", into = "Vec<FileEntry>")]
pub struct FileSet {
    entries: Vec<FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a published listing. Duplicate keys: the last entry wins but
    /// keeps the slot of the first occurrence, so the result is deterministic.
    pub fn from_entries(entries: Vec<FileEntry>) -> Self {
        let mut slot: HashMap<FileKey, usize> = HashMap::with_capacity(entries.len());
        let mut out: Vec<FileEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match slot.get(&entry.key()) {
                Some(&i) => out[i] = entry,
                None => {
                    slot.insert(entry.key(), out.len());
                    out.push(entry);
                }
            }
        }
        Self { entries: out }
    }

    pub fn push(&mut self, entry: FileEntry) {
        let key = entry.key();
        match self.entries.iter_mut().find(|e| e.key() == key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &FileKey) -> bool {
        self.entries.iter().any(|e| &e.key() == key)
    }

    /// Entries whose key is not in `exclude`, in this set's order.
    pub fn without(&self, exclude: &FileSet) -> FileSet {
        let skip: std::collections::HashSet<FileKey> = exclude.iter().map(FileEntry::key).collect();
        FileSet {
            entries: self
                .entries
                .iter()
                .filter(|e| !skip.contains(&e.key()))
                .cloned()
                .collect(),
        }
    }

    pub fn into_entries(self) -> Vec<FileEntry> {
        self.entries
    }
}

impl From<Vec<FileEntry>> for FileSet {
    fn from(entries: Vec<FileEntry>) -> Self {
        FileSet::from_entries(entries)
    }
}

impl From<FileSet> for Vec<FileEntry> {
    fn from(set: FileSet) -> Self {
        set.entries
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<FileEntry> for FileSet {
    fn from_iter<T: IntoIterator<Item = FileEntry>>(iter: T) -> Self {
        FileSet::from_entries(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModLoaderTarget {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Game, loader and runtime versions a modpack version targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackTargets {
    #[serde(rename = "modLoader", default)]
    pub mod_loader: ModLoaderTarget,
    #[serde(rename = "javaVersion", default)]
    pub java_version: String,
    #[serde(rename = "mcVersion", default)]
    pub mc_version: String,
}

/// Durable record of what is currently installed in a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledManifest {
    #[serde(rename = "id")]
    pub pack_id: u64,
    #[serde(rename = "name", default)]
    pub pack_name: String,
    #[serde(rename = "versionName", default)]
    pub version_name: String,
    #[serde(rename = "versionId")]
    pub version_id: u64,
    #[serde(rename = "modPackTargets", default)]
    pub targets: ModpackTargets,
    #[serde(rename = "files", default, skip_serializing_if = "FileSet::is_empty")]
    pub file_set: FileSet,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
