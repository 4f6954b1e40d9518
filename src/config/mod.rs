pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{
    load_from_path, load_from_str, load_or_builtin, parse_definition, ConfigError,
    DefinitionOrigin, BUILTIN_PATCH,
};
pub use schema::{
    Branch, GuardSpec, Metadata, PatchDefinition, Target, ValidationError, ValidationIssue,
};
pub use version::{PythonVersion, VersionError};
