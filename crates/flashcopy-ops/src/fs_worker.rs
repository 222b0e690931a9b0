//! Filesystem-backed worker for copy and delete.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use flashcopy_core::{ImageInfoOutcome, ImageProcessOutcome, Outcome, ValidationOutcome};
use tracing::debug;

use crate::worker::{Reporter, Worker};

/// Chunk size used when streaming a copy.
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

const IMAGE_UNSUPPORTED: &str = "Image inspection is not supported by the filesystem worker";

/// Worker that copies and deletes with `std::fs`.
///
/// Image validation and extraction need an image-aware worker; this one
/// reports them as failed.
#[derive(Debug, Clone)]
pub struct FsWorker {
    chunk_size: usize,
}

impl FsWorker {
    pub fn new() -> Self {
        Self {
            chunk_size: COPY_CHUNK_SIZE,
        }
    }

    /// Use a custom copy chunk size (at least one byte).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for FsWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for FsWorker {
    fn copy(&self, source: &Path, destination: &Path, reporter: &Reporter) -> Outcome {
        if !source.is_file() {
            return Outcome::failed(format!(
                "Source file does not exist: {}",
                source.display()
            ));
        }

        match copy_file(source, destination, self.chunk_size, reporter) {
            Ok(bytes) => {
                debug!(bytes, source = %source.display(), "copy finished");
                Outcome::succeeded("Copy completed.")
            }
            Err(e) => {
                // A partial destination is useless to the caller.
                let _ = fs::remove_file(destination);
                Outcome::failed(format!("Failed to copy: {}", e))
            }
        }
    }

    fn delete(&self, path: &Path) -> Outcome {
        let Ok(metadata) = fs::symlink_metadata(path) else {
            return Outcome::failed(format!("File does not exist: {}", path.display()));
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match result {
            Ok(()) => Outcome::succeeded(format!("Deleted {}", path.display())),
            Err(e) => Outcome::failed(format!("Failed to delete {}: {}", path.display(), e)),
        }
    }

    fn validate_image(&self, _path: &Path, _reporter: &Reporter) -> ValidationOutcome {
        ValidationOutcome::failed(IMAGE_UNSUPPORTED)
    }

    fn extract_info(&self, _path: &Path) -> ImageInfoOutcome {
        ImageInfoOutcome::failed(IMAGE_UNSUPPORTED)
    }

    fn extract_and_validate(&self, _path: &Path, _reporter: &Reporter) -> ImageProcessOutcome {
        ImageProcessOutcome::failed(IMAGE_UNSUPPORTED)
    }
}

/// Stream `source` into `dest`, reporting after every chunk.
fn copy_file(source: &Path, dest: &Path, chunk_size: usize, reporter: &Reporter) -> io::Result<u64> {
    let mut input = File::open(source)?;
    let total = input.metadata()?.len();
    reporter.copy_progress(0, total);

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut output = File::create(dest)?;
    let mut buf = vec![0u8; chunk_size];
    let mut copied = 0u64;

    loop {
        let read = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        output.write_all(&buf[..read])?;
        copied += read as u64;
        reporter.copy_progress(copied, total.max(copied));
    }

    output.sync_all()?;
    Ok(copied)
}
