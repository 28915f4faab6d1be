//! `packsync diff`: classify two manifests the way an update would.

use anyhow::Result;
use packsync_core::diff::{added, diff};
use packsync_core::manifest::read_manifest_file;
use std::path::Path;

pub fn run_diff(old_path: &Path, new_path: &Path) -> Result<()> {
    let old = read_manifest_file(old_path)?;
    let new = read_manifest_file(new_path)?;
    let result = diff(&old.file_set, &new.file_set);
    let new_only = added(&new.file_set, &result);

    println!(
        "{} {} -> {} {}",
        old.pack_name, old.version_name, new.pack_name, new.version_name
    );
    for e in &result.changed {
        println!("~ {}", e.display_path());
    }
    for e in &result.removed {
        println!("- {}", e.display_path());
    }
    for e in &new_only {
        println!("+ {}", e.display_path());
    }
    println!(
        "{} changed, {} removed, {} added, {} unchanged",
        result.changed.len(),
        result.removed.len(),
        new_only.len(),
        result.unchanged.len()
    );
    Ok(())
}
