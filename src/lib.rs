//! venv-patcher: idempotent compatibility patches for installed Python packages
//!
//! Locates a package module inside a virtual environment and rewrites the
//! interpreter-version guards in it. The built-in patch makes uvicorn's
//! `asyncio_run` tolerate the `asyncio.run()` installed by `nest_asyncio`,
//! which rejects the `loop_factory` keyword.
//!
//! # Architecture
//!
//! - [`locate`] picks the environment prefix and the first existing
//!   `site-packages` candidate.
//! - [`strategy`] holds the ordered rewrites (regex, literal variants, line
//!   scan); the first one that changes the text wins.
//! - [`writer`] replaces the file atomically, and only if the text changed.
//! - [`patcher`] ties them together around the marker check that makes
//!   every run after the first a no-op.
//!
//! # Example
//!
//! ```no_run
//! use venv_patcher::{load_or_builtin, Patcher};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let definition = load_or_builtin(None)?;
//! let patcher = Patcher::new(&definition)?;
//! let report = patcher.patch_file(Path::new("venv/lib/python3.12/site-packages/uvicorn/_compat.py"))?;
//! println!("{}", report.result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostic;
pub mod locate;
pub mod logging;
pub mod patcher;
pub mod safety;
pub mod strategy;
pub mod writer;

// Re-exports
pub use config::{
    load_from_path, load_from_str, load_or_builtin, ConfigError, DefinitionOrigin, PatchDefinition,
    PythonVersion, VersionError,
};
pub use diagnostic::{guard_context, ContextLine};
pub use locate::{locate, HostEnv, LocateError, Located, Prefix, PrefixSource};
pub use patcher::{PatchError, PatchReport, PatchResult, Patcher, TextOutcome};
pub use safety::{EnvironmentGuard, SafetyError};
pub use strategy::{Strategies, Strategy, StrategyKind};
pub use writer::{write_if_changed, WriteError, WriteOutcome};
