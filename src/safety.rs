use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keeps edits inside the virtual environment the target was located in.
///
/// A `site-packages` entry symlinked to a system interpreter would otherwise
/// let the patch rewrite files shared by every environment on the machine.
#[derive(Debug, Clone)]
pub struct EnvironmentGuard {
    /// Canonical environment prefix
    prefix: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside the environment: {path} (environment: {prefix})")]
    OutsideEnvironment { path: PathBuf, prefix: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl EnvironmentGuard {
    /// Create a guard rooted at `prefix`, canonicalized to resolve symlinks.
    pub fn new(prefix: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            prefix: prefix.as_ref().canonicalize()?,
        })
    }

    /// Check that `path` resolves inside the environment.
    ///
    /// Returns the canonicalized path. Call [`revalidate`](Self::revalidate)
    /// right before writing to narrow the TOCTOU window.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.prefix.join(path)
        };

        let canonical = absolute.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Re-canonicalize and re-check a previously validated path.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = path.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.prefix) {
            return Err(SafetyError::OutsideEnvironment {
                path: canonical.to_path_buf(),
                prefix: self.prefix.clone(),
            });
        }
        Ok(())
    }
}
