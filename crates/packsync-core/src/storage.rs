//! Destination file lifecycle for one transfer attempt.
//!
//! Bodies are streamed straight into the final path: create parent dirs,
//! truncate, append chunks, sync. A failed attempt calls `discard`, which
//! removes whatever was written so no partial file is left at rest.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::TransferError;

const WRITE_BUF: usize = 64 * 1024;

pub struct DestinationFile {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl DestinationFile {
    /// Create (or truncate) `path`, creating missing parent directories.
    pub fn create(path: &Path) -> Result<Self, TransferError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| TransferError::io(path, e))?;
        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUF, file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffers and sync to disk; the file stays at its path. If the
    /// tail cannot be flushed or synced the file is deleted.
    pub fn finish(self) -> std::io::Result<u64> {
        let Self { writer, path, written } = self;
        let flushed = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all());
        settle(&path, flushed).map(|()| written)
    }

    /// Close and delete the file.
    pub fn discard(self) -> Result<(), TransferError> {
        let path = self.path.clone();
        drop(self.writer);
        remove_if_exists(&path)
    }
}

fn settle(path: &Path, flushed: std::io::Result<()>) -> std::io::Result<()> {
    if let Err(e) = flushed {
        if let Err(rm) = remove_if_exists(path) {
            tracing::warn!("could not remove unfinished {}: {}", path.display(), rm);
        }
        return Err(e);
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> Result<(), TransferError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TransferError::io(path, e)),
    }
}
