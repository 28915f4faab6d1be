//! Map a file entry onto a path under the install directory.
//!
//! Catalog paths look like `./mods/` or `config/jei`; they are joined with the
//! entry name. Anything that would land outside the install dir is refused.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::FileEntry;

/// Entry whose path or name escapes the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafePath {
    pub entry: String,
}

impl fmt::Display for UnsafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refusing path outside install dir: {}", self.entry)
    }
}

impl std::error::Error for UnsafePath {}

/// Catalog directory in canonical form: `/`-separated, without empty or `.`
/// segments. `./mods/`, `mods` and `/mods` all become `mods`.
pub fn normalized_dir(relative_path: &str) -> String {
    relative_path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// `install_dir/relative_path/name`, rejecting absolute paths, `..`, and
/// names containing separators.
pub fn destination_path(install_dir: &Path, entry: &FileEntry) -> Result<PathBuf, UnsafePath> {
    let refuse = || UnsafePath {
        entry: entry.display_path(),
    };

    let name = entry.name.as_str();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(refuse());
    }

    let mut out = install_dir.to_path_buf();
    for part in entry.relative_path.split(['/', '\\']) {
        if part.is_empty() {
            continue;
        }
        match Path::new(part).components().next() {
            Some(Component::CurDir) => {}
            Some(Component::Normal(p)) if !part.contains('\0') => out.push(p),
            _ => return Err(refuse()),
        }
    }
    out.push(name);
    Ok(out)
}
