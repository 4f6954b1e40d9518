use crate::config::version::PythonVersion;
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A complete patch: which module to edit and how to rewrite its version guards.
#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    #[serde(default)]
    pub meta: Metadata,
    pub target: Target,
    pub guard: GuardSpec,
}

impl PatchDefinition {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "meta.name" });
        }
        if self.meta.marker.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "meta.marker",
            });
        }
        if self.target.package.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "target.package",
            });
        }
        if self.target.module.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "target.module",
            });
        }
        if !is_relative_inside(&self.target.package) || !is_relative_inside(&self.target.module) {
            issues.push(ValidationIssue::InvalidTarget {
                message: format!(
                    "'{}/{}' must be a relative path without '..'",
                    self.target.package, self.target.module
                ),
            });
        }
        if self.guard.subject.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "guard.subject",
            });
        }
        if self.guard.original.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "guard.original",
            });
        }

        if self.guard.branches.is_empty() {
            issues.push(ValidationIssue::NoBranches);
        }

        let mut seen = Vec::new();
        for branch in &self.guard.branches {
            if seen.contains(&branch.threshold) {
                issues.push(ValidationIssue::DuplicateThreshold {
                    threshold: branch.threshold,
                });
            }
            seen.push(branch.threshold);

            if branch.body.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "guard.branches.body",
                });
                continue;
            }
            // Without the marker a patched file would be patched again on the next run
            if !self.meta.marker.trim().is_empty() && !branch.body.contains(&self.meta.marker) {
                issues.push(ValidationIssue::MarkerNotInBody {
                    threshold: branch.threshold,
                });
            }
            let original = self.guard.original.trim();
            if !original.is_empty() && branch.body.contains(original) {
                issues.push(ValidationIssue::OriginalInBody {
                    threshold: branch.threshold,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Path of the module relative to `site-packages`.
    pub fn module_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for part in self
            .target
            .package
            .split('/')
            .chain(self.target.module.split('/'))
            .filter(|part| !part.is_empty())
        {
            path.push(part);
        }
        path
    }

    /// The first configured branch, tried first by every strategy.
    pub fn primary_branch(&self) -> Option<&Branch> {
        self.guard.branches.first()
    }
}

fn is_relative_inside(value: &str) -> bool {
    Path::new(value)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Literal whose presence means the patch has already been applied
    #[serde(default)]
    pub marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Target {
    /// Package directory under `site-packages`
    pub package: String,
    /// Module file inside the package directory
    pub module: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardSpec {
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Single-line statement the unpatched guards contain
    pub original: String,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

fn default_subject() -> String {
    "sys.version_info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Branch {
    pub threshold: PythonVersion,
    /// Block body, indented with four spaces per level relative to the guard
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    InvalidTarget { message: String },
    NoBranches,
    DuplicateThreshold { threshold: PythonVersion },
    MarkerNotInBody { threshold: PythonVersion },
    OriginalInBody { threshold: PythonVersion },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "patch definition missing required field '{field}'")
            }
            ValidationIssue::InvalidTarget { message } => write!(f, "invalid target: {message}"),
            ValidationIssue::NoBranches => write!(f, "patch definition has no guard branches"),
            ValidationIssue::DuplicateThreshold { threshold } => {
                write!(f, "guard branch for {threshold} is defined more than once")
            }
            ValidationIssue::MarkerNotInBody { threshold } => {
                write!(f, "guard branch for {threshold} does not contain the marker")
            }
            ValidationIssue::OriginalInBody { threshold } => {
                write!(
                    f,
                    "guard branch for {threshold} still contains the original statement"
                )
            }
        }
    }
}
