//! `packsync checksum`: print a file's digest.

use anyhow::Result;
use packsync_core::checksum::{self, HashAlgorithm};
use std::path::Path;

pub fn run_checksum(path: &Path, algorithm: HashAlgorithm) -> Result<()> {
    let digest = checksum::digest(path, algorithm)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
