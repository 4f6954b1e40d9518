//! Patch application - marker check, strategy chain, conditional write
//!
//! Per run a target moves through
//! `Located -> {AlreadyPatched | PatternApplied | NoPatternMatched} -> {Written | Unwritten}`.
//! Concurrent runs against one file are not coordinated; the writer only
//! refuses to overwrite content that changed after it was read.

use crate::config::PatchDefinition;
use crate::diagnostic::{guard_context, ContextLine};
use crate::safety::{EnvironmentGuard, SafetyError};
use crate::strategy::{Strategies, StrategyError, StrategyKind};
use crate::writer::{write_if_changed, WriteError, WriteOutcome};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of running a patch against one file
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// Patch was applied and the file rewritten
    Applied { file: PathBuf, strategy: StrategyKind },
    /// Marker already present; the file was not touched
    AlreadyApplied { file: PathBuf },
    /// Patch would apply, but the run was read-only
    WouldApply { file: PathBuf, strategy: StrategyKind },
}

impl PatchResult {
    pub fn file(&self) -> &Path {
        match self {
            PatchResult::Applied { file, .. }
            | PatchResult::AlreadyApplied { file }
            | PatchResult::WouldApply { file, .. } => file,
        }
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file, strategy } => {
                write!(f, "Applied patch to {} ({})", file.display(), strategy)
            }
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            PatchResult::WouldApply { file, strategy } => {
                write!(f, "Would apply to {} ({})", file.display(), strategy)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("no recognized version guard in {}", file.display())]
    PatternNotMatched {
        file: PathBuf,
        context: Vec<ContextLine>,
    },

    #[error("failed to read {}: {source}", file.display())]
    Read {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Outcome of patching text in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    AlreadyPatched,
    Patched { content: String, strategy: StrategyKind },
    Unmatched { context: Vec<ContextLine> },
}

/// Applies one patch definition.
#[derive(Debug)]
pub struct Patcher<'a> {
    definition: &'a PatchDefinition,
    strategies: Strategies,
    guard: Option<EnvironmentGuard>,
    dry_run: bool,
}

/// A finished run: the result plus both versions of the text for diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub result: PatchResult,
    pub original: String,
    pub patched: String,
}

impl<'a> Patcher<'a> {
    pub fn new(definition: &'a PatchDefinition) -> Result<Self, PatchError> {
        Ok(Self {
            definition,
            strategies: Strategies::compile(definition)?,
            guard: None,
            dry_run: false,
        })
    }

    /// Refuse to touch files that resolve outside `guard`'s environment.
    pub fn with_guard(mut self, guard: EnvironmentGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Compute results without writing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Patch `content` in memory.
    pub fn patch_text(&self, content: &str) -> TextOutcome {
        if content.contains(&self.definition.meta.marker) {
            return TextOutcome::AlreadyPatched;
        }

        match self.strategies.apply(content) {
            Some((patched, strategy)) => TextOutcome::Patched {
                content: patched,
                strategy,
            },
            None => TextOutcome::Unmatched {
                context: guard_context(content, &self.definition.guard.subject),
            },
        }
    }

    /// Patch the file at `path`, writing only when the content changes.
    pub fn patch_file(&self, path: &Path) -> Result<PatchReport, PatchError> {
        let file = match &self.guard {
            Some(guard) => guard.validate_path(path)?,
            None => path.to_path_buf(),
        };

        let original = fs::read_to_string(&file).map_err(|source| PatchError::Read {
            file: file.clone(),
            source,
        })?;

        match self.patch_text(&original) {
            TextOutcome::AlreadyPatched => {
                tracing::debug!(file = %file.display(), "marker present");
                Ok(PatchReport {
                    result: PatchResult::AlreadyApplied { file },
                    patched: original.clone(),
                    original,
                })
            }
            TextOutcome::Unmatched { context } => {
                Err(PatchError::PatternNotMatched { file, context })
            }
            TextOutcome::Patched { content, strategy } => {
                if self.dry_run {
                    return Ok(PatchReport {
                        result: PatchResult::WouldApply { file, strategy },
                        original,
                        patched: content,
                    });
                }

                if let Some(guard) = &self.guard {
                    guard.revalidate(&file)?;
                }

                let result = match write_if_changed(&file, &original, &content)? {
                    WriteOutcome::Written { .. } => PatchResult::Applied { file, strategy },
                    // Strategies only report output that differs from the input
                    WriteOutcome::Unchanged => PatchResult::AlreadyApplied { file },
                };

                Ok(PatchReport {
                    result,
                    original,
                    patched: content,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, BUILTIN_PATCH};

    const UNPATCHED: &str = "\
import asyncio
import sys

if sys.version_info >= (3, 13):
    asyncio_run = asyncio.run
elif sys.version_info >= (3, 12):
    asyncio_run = asyncio.run
else:
    pass
";

    #[test]
    fn test_patch_text_marker_short_circuits() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let patcher = Patcher::new(&def).unwrap();
        let content = format!("# {}\n{}", def.meta.marker, UNPATCHED);

        assert_eq!(patcher.patch_text(&content), TextOutcome::AlreadyPatched);
    }

    #[test]
    fn test_patch_text_then_already_patched() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let patcher = Patcher::new(&def).unwrap();

        let TextOutcome::Patched { content, strategy } = patcher.patch_text(UNPATCHED) else {
            panic!("expected patch to apply");
        };
        assert_eq!(strategy, StrategyKind::Regex);
        assert_eq!(patcher.patch_text(&content), TextOutcome::AlreadyPatched);
    }

    #[test]
    fn test_patch_text_unmatched_has_context() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let patcher = Patcher::new(&def).unwrap();

        let content = "import sys\nif sys.version_info >= (3, 10):\n    run = other\n";
        let TextOutcome::Unmatched { context } = patcher.patch_text(content) else {
            panic!("expected no match");
        };
        assert_eq!(context[0].line, 2);
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_patch_file_dry_run_does_not_write() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("_compat.py");
        fs::write(&file, UNPATCHED).unwrap();

        let report = Patcher::new(&def)
            .unwrap()
            .dry_run(true)
            .patch_file(&file)
            .unwrap();

        assert!(matches!(report.result, PatchResult::WouldApply { .. }));
        assert_ne!(report.original, report.patched);
        assert_eq!(fs::read_to_string(&file).unwrap(), UNPATCHED);
    }

    #[test]
    fn test_patch_file_missing_is_read_error() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = Patcher::new(&def)
            .unwrap()
            .patch_file(&dir.path().join("missing.py"))
            .unwrap_err();
        assert!(matches!(err, PatchError::Read { .. }));
    }

    #[test]
    fn test_guard_rejects_file_outside_environment() {
        let def = load_from_str(BUILTIN_PATCH).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("venv");
        fs::create_dir_all(&prefix).unwrap();
        let outside = dir.path().join("_compat.py");
        fs::write(&outside, UNPATCHED).unwrap();

        let err = Patcher::new(&def)
            .unwrap()
            .with_guard(EnvironmentGuard::new(&prefix).unwrap())
            .patch_file(&outside)
            .unwrap_err();

        assert!(matches!(err, PatchError::Safety(_)));
        assert_eq!(fs::read_to_string(&outside).unwrap(), UNPATCHED);
    }

    #[test]
    fn test_patch_result_display() {
        let applied = PatchResult::Applied {
            file: PathBuf::from("/tmp/_compat.py"),
            strategy: StrategyKind::Literal,
        };
        assert!(applied.to_string().contains("Applied"));
        assert!(applied.to_string().contains("literal"));

        let already = PatchResult::AlreadyApplied {
            file: PathBuf::from("/tmp/_compat.py"),
        };
        assert!(already.to_string().contains("Already applied"));
        assert_eq!(already.file(), Path::new("/tmp/_compat.py"));
    }
}
