use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Fingerprint of the content a write expects to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHash(u64);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        Self(xxh3_64(text.as_bytes()))
    }

    pub fn matches(&self, text: &str) -> bool {
        Self::of(text) == *self
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{file} changed on disk since it was read; re-run to patch the current content")]
    ContentChanged { file: PathBuf },

    #[error("failed to write {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "WriteOutcome tells whether the file was touched"]
pub enum WriteOutcome {
    /// Candidate equals the original; the filesystem was not touched
    Unchanged,
    /// Candidate replaced the file
    Written { bytes: usize },
}

/// Replace `file` with `candidate` if it differs from `original`.
///
/// The file is re-read first and must still hash to `original`. The write is
/// atomic (tempfile + fsync + rename) and bumps the mtime.
pub fn write_if_changed(
    file: &Path,
    original: &str,
    candidate: &str,
) -> Result<WriteOutcome, WriteError> {
    if original == candidate {
        return Ok(WriteOutcome::Unchanged);
    }

    let io_err = |source| WriteError::Io {
        file: file.to_path_buf(),
        source,
    };

    let expected = ContentHash::of(original);
    let on_disk = fs::read_to_string(file).map_err(io_err)?;
    if !expected.matches(&on_disk) {
        return Err(WriteError::ContentChanged {
            file: file.to_path_buf(),
        });
    }

    atomic_write(file, candidate.as_bytes()).map_err(io_err)?;

    // Stamp the module with the time it was replaced, after the rename
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(file, now).map_err(io_err)?;

    tracing::debug!(file = %file.display(), bytes = candidate.len(), "wrote patched file");

    Ok(WriteOutcome::Written {
        bytes: candidate.len(),
    })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. Permissions of an
/// existing file are carried over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
