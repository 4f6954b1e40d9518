//! Reading patch definitions: the built-in uvicorn patch or a user TOML file.

use crate::config::schema::{PatchDefinition, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The uvicorn / nest_asyncio compatibility patch shipped with the binary.
pub const BUILTIN_PATCH: &str = include_str!("../../patches/uvicorn-nest-asyncio.toml");

/// Where a definition's text came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionOrigin {
    Builtin,
    File(PathBuf),
    Inline,
}

impl fmt::Display for DefinitionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionOrigin::Builtin => f.write_str("built-in"),
            DefinitionOrigin::File(path) => write!(f, "{}", path.display()),
            DefinitionOrigin::Inline => f.write_str("inline"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read patch definition {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse patch definition TOML ({origin}): {source}")]
    Parse {
        origin: DefinitionOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid patch definition ({origin}): {source}")]
    Invalid {
        origin: DefinitionOrigin,
        #[source]
        source: ValidationError,
    },
}

/// Deserialize and validate a definition whose text came from `origin`.
pub fn parse_definition(
    input: &str,
    origin: DefinitionOrigin,
) -> Result<PatchDefinition, ConfigError> {
    let definition: PatchDefinition = match toml_edit::de::from_str(input) {
        Ok(definition) => definition,
        Err(source) => return Err(ConfigError::Parse { origin, source }),
    };
    if let Err(source) = definition.validate() {
        return Err(ConfigError::Invalid { origin, source });
    }

    tracing::debug!(name = %definition.meta.name, %origin, "loaded patch definition");
    Ok(definition)
}

pub fn load_from_str(input: &str) -> Result<PatchDefinition, ConfigError> {
    parse_definition(input, DefinitionOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchDefinition, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definition(&input, DefinitionOrigin::File(path.to_path_buf()))
}

/// Load the definition at `path`, or the built-in one when no path is given.
pub fn load_or_builtin(path: Option<&Path>) -> Result<PatchDefinition, ConfigError> {
    match path {
        Some(path) => load_from_path(path),
        None => parse_definition(BUILTIN_PATCH, DefinitionOrigin::Builtin),
    }
}
