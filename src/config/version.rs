//! Python interpreter versions as they appear in guards and environments
//!
//! Only `major.minor` matters for locating `lib/pythonX.Y` and for rendering
//! `sys.version_info >= (X, Y)` guards, so anything after the minor
//! component (`3.12.4`, `3.12.4.final.0`, `3.13.0rc1`) is accepted and dropped.

use std::fmt;
use std::str::FromStr;

/// Errors while parsing a Python version string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Empty input
    Empty,
    /// A component was not a number (e.g., "three.twelve")
    InvalidComponent { value: String, component: String },
    /// Only a major component was given (e.g., "3")
    MissingMinor { value: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::Empty => write!(f, "empty python version"),
            VersionError::InvalidComponent { value, component } => {
                write!(
                    f,
                    "invalid python version '{}': '{}' is not a number",
                    value, component
                )
            }
            VersionError::MissingMinor { value } => {
                write!(f, "invalid python version '{}': expected MAJOR.MINOR", value)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// A `major.minor` Python version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Directory name used under `<prefix>/lib` on Unix layouts.
    pub fn lib_dir_name(&self) -> String {
        format!("python{}.{}", self.major, self.minor)
    }

    /// Tuple literal used in `sys.version_info` comparisons.
    pub fn tuple_literal(&self) -> String {
        format!("({}, {})", self.major, self.minor)
    }

    /// Parse a `lib/` directory name such as `python3.12`.
    pub fn from_lib_dir_name(name: &str) -> Option<Self> {
        name.strip_prefix("python")?.parse().ok()
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut parts = trimmed.split('.');
        let major = parse_component(value, parts.next().unwrap_or_default())?;
        let Some(minor) = parts.next() else {
            return Err(VersionError::MissingMinor {
                value: value.to_string(),
            });
        };

        // "13rc1" -> "13": pre-release tags trail the minor digits
        let digits: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
        let minor = parse_component(value, if digits.is_empty() { minor } else { &digits })?;

        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for PythonVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn parse_component(value: &str, component: &str) -> Result<u32, VersionError> {
    component
        .parse()
        .map_err(|_| VersionError::InvalidComponent {
            value: value.to_string(),
            component: component.to_string(),
        })
}
