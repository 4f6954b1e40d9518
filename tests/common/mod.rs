//! Shared fixtures: fake virtual environments and uvicorn `_compat.py` layouts.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MARKER: &str = "Workaround for nest_asyncio compatibility";

/// uvicorn 0.30+ layout: one `if` guard for 3.12 with a plain assignment.
pub const UVICORN_COMPAT: &str = r#"from __future__ import annotations

import asyncio
import sys
from collections.abc import Callable, Coroutine
from typing import Any, TypeVar

_T = TypeVar("_T")

if sys.version_info >= (3, 12):
    asyncio_run = asyncio.run
elif sys.version_info >= (3, 11):

    def asyncio_run(
        main: Coroutine[Any, Any, _T],
        *,
        debug: bool = False,
        loop_factory: Callable[[], asyncio.AbstractEventLoop] | None = None,
    ) -> _T:
        # asyncio.run from Python 3.12
        # https://docs.python.org/3/license.html#psf-license
        with asyncio.Runner(debug=debug, loop_factory=loop_factory) as runner:
            return runner.run(main)

else:
    # modified version of asyncio.run from Python 3.10 to add loop_factory kwarg
    def asyncio_run(main, *, debug=False, loop_factory=None):
        raise NotImplementedError
"#;

/// Layout with a dedicated 3.13 guard ahead of the 3.12 one.
pub const COMPAT_WITH_313: &str = r#"import asyncio
import sys

if sys.version_info >= (3, 13):
    asyncio_run = asyncio.run
elif sys.version_info >= (3, 12):
    def asyncio_run(main, *, debug=False, loop_factory=None):
        return asyncio.run(main, debug=debug, loop_factory=loop_factory)
else:
    asyncio_run = None
"#;

/// Tab-indented variant of the 3.13 layout.
pub const COMPAT_WITH_TABS: &str = "import asyncio\nimport sys\n\nif sys.version_info >= (3, 13):\n\tasyncio_run = asyncio.run\nelse:\n\tasyncio_run = None\n";

/// No guard the patch recognizes.
pub const COMPAT_UNKNOWN: &str = r#"import asyncio
import sys

if sys.version_info >= (3, 10):
    run = asyncio.run
else:
    run = None
"#;

/// A project directory containing an environment with uvicorn installed for Python 3.12.
pub struct FakeProject {
    pub dir: TempDir,
    env_dir: &'static str,
}

impl FakeProject {
    pub fn new(compat: &str) -> Self {
        Self::with_env_dir("venv", compat)
    }

    pub fn with_env_dir(env_dir: &'static str, compat: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let project = Self { dir, env_dir };

        let module = project.module();
        fs::create_dir_all(module.parent().unwrap()).unwrap();
        fs::write(&module, compat).unwrap();
        fs::write(
            project.prefix().join("pyvenv.cfg"),
            "home = /usr/bin\ninclude-system-site-packages = false\nversion = 3.12.4\n",
        )
        .unwrap();
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn prefix(&self) -> PathBuf {
        self.dir.path().join(self.env_dir)
    }

    pub fn module(&self) -> PathBuf {
        self.prefix()
            .join("lib/python3.12/site-packages/uvicorn/_compat.py")
    }

    pub fn read_module(&self) -> String {
        fs::read_to_string(self.module()).unwrap()
    }
}
