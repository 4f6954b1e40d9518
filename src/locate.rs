//! Finding the target module inside a Python virtual environment.
//!
//! Resolution happens in two steps. First an environment prefix is chosen:
//! an explicit path, the active environment (`VIRTUAL_ENV`), or a `venv` /
//! `.venv` directory under the working directory. Then a fixed list of
//! `site-packages` layouts under that prefix is checked, and the first
//! candidate that exists wins.

use crate::config::PythonVersion;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Conventional environment directory names, checked under the working directory.
pub const VENV_DIR_NAMES: [&str; 2] = ["venv", ".venv"];

/// Variable set by `activate` scripts (and uv, poetry, pipenv shells).
pub const VIRTUAL_ENV_VAR: &str = "VIRTUAL_ENV";

/// Host state the locator depends on, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// Prefix of the active virtual environment, if any
    pub virtual_env: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl HostEnv {
    pub fn from_process() -> std::io::Result<Self> {
        Ok(Self {
            virtual_env: env::var_os(VIRTUAL_ENV_VAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            cwd: env::current_dir()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixSource {
    /// `--venv` on the command line
    Explicit,
    /// `VIRTUAL_ENV` of the calling shell
    Active,
    /// `venv` or `.venv` under the working directory
    WorkingDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub path: PathBuf,
    pub source: PrefixSource,
}

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("no virtual environment found (VIRTUAL_ENV is not set and {cwd} has no venv/ or .venv/)")]
    NoEnvironment { cwd: PathBuf },

    #[error("{module} not found under {prefix}")]
    NotFound {
        prefix: PathBuf,
        module: PathBuf,
        searched: Vec<PathBuf>,
    },
}

/// Choose the environment prefix.
///
/// Priority: explicit path, active environment, working-directory convention.
/// A `VIRTUAL_ENV` that names a missing directory is skipped.
pub fn resolve_prefix(explicit: Option<&Path>, host: &HostEnv) -> Option<Prefix> {
    if let Some(path) = explicit {
        return Some(Prefix {
            path: path.to_path_buf(),
            source: PrefixSource::Explicit,
        });
    }

    if let Some(active) = &host.virtual_env {
        if active.is_dir() {
            return Some(Prefix {
                path: active.clone(),
                source: PrefixSource::Active,
            });
        }
        tracing::debug!(
            path = %active.display(),
            "{VIRTUAL_ENV_VAR} is set but is not a directory, ignoring it"
        );
    }

    VENV_DIR_NAMES
        .iter()
        .map(|name| host.cwd.join(name))
        .find(|path| path.is_dir())
        .map(|path| Prefix {
            path,
            source: PrefixSource::WorkingDir,
        })
}

/// Interpreter version recorded in `<prefix>/pyvenv.cfg`.
///
/// virtualenv and uv write `version_info = 3.12.4.final.0`; the stdlib `venv`
/// module writes `version = 3.12.4`. `version_info` wins when both exist.
pub fn read_pyvenv_version(prefix: &Path) -> Option<PythonVersion> {
    let cfg = fs::read_to_string(prefix.join("pyvenv.cfg")).ok()?;

    let mut version = None;
    for line in cfg.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "version_info" => return value.trim().parse().ok(),
            "version" => version = value.trim().parse().ok(),
            _ => {}
        }
    }
    version
}

/// `lib/pythonX.Y` directories present under the prefix, newest first.
pub fn scan_lib_versions(prefix: &Path) -> Vec<PythonVersion> {
    let mut versions: Vec<PythonVersion> = WalkDir::new(prefix.join("lib"))
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(PythonVersion::from_lib_dir_name)
        })
        .collect();

    versions.sort_unstable_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}

/// Interpreter versions whose `lib/pythonX.Y` layouts are worth checking.
///
/// Priority: explicit version, `pyvenv.cfg`, directories found under `lib/`.
pub fn detect_python_versions(
    prefix: &Path,
    explicit: Option<PythonVersion>,
) -> Vec<PythonVersion> {
    if let Some(version) = explicit {
        return vec![version];
    }
    if let Some(version) = read_pyvenv_version(prefix) {
        tracing::debug!(%version, "python version from pyvenv.cfg");
        return vec![version];
    }
    let scanned = scan_lib_versions(prefix);
    tracing::debug!(?scanned, "python versions from lib/");
    scanned
}

/// Candidate locations of `module` (relative to `site-packages`), in order.
pub fn candidate_paths(prefix: &Path, versions: &[PythonVersion], module: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(versions.len() + 2);

    // Windows
    candidates.push(prefix.join("Lib").join("site-packages").join(module));

    // Unix/macOS
    for version in versions {
        candidates.push(
            prefix
                .join("lib")
                .join(version.lib_dir_name())
                .join("site-packages")
                .join(module),
        );
    }

    // PyPy and some distro layouts
    candidates.push(prefix.join("lib").join("site-packages").join(module));

    candidates
}

/// First candidate that exists as a file. Only the given paths are touched.
pub fn find_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// A located target module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub prefix: Prefix,
    pub file: PathBuf,
}

/// Locate `module` for the given host state.
pub fn locate(
    module: &Path,
    explicit_prefix: Option<&Path>,
    python: Option<PythonVersion>,
    host: &HostEnv,
) -> Result<Located, LocateError> {
    let prefix = resolve_prefix(explicit_prefix, host).ok_or_else(|| LocateError::NoEnvironment {
        cwd: host.cwd.clone(),
    })?;
    tracing::debug!(prefix = %prefix.path.display(), source = ?prefix.source, "environment prefix");

    let versions = detect_python_versions(&prefix.path, python);
    let candidates = candidate_paths(&prefix.path, &versions, module);
    for candidate in &candidates {
        tracing::debug!(candidate = %candidate.display(), "checking");
    }

    match find_existing(&candidates) {
        Some(file) => Ok(Located { prefix, file }),
        None => Err(LocateError::NotFound {
            prefix: prefix.path,
            module: module.to_path_buf(),
            searched: candidates,
        }),
    }
}
