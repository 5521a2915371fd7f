//! # Installers
//!
//! An [`Installer`] makes a repository runnable through one mechanism. The
//! set of mechanisms is closed:
//!
//! | Layer          | Installer              | Trigger                         |
//! |----------------|------------------------|---------------------------------|
//! | `OsPackages`   | [`OsPackageInstaller`] | PKGBUILD, debian/control, *.spec |
//! | `Nix`          | [`NixFlakeInstaller`]  | `flake.nix`                     |
//! | `Python`       | [`PythonInstaller`]    | `pyproject.toml` / `setup.py`   |
//! | `Makefile`     | [`MakefileInstaller`]  | `Makefile` with `install:`      |
//!
//! Layers are ordered by priority. The [`pipeline`] walks installers in that
//! order and uses each installer's discovered [`Capability`] set to avoid
//! installing the same thing twice.

pub mod capability;
pub mod makefile;
pub mod nix;
pub mod os_packages;
pub mod pipeline;
pub mod python;

pub use makefile::MakefileInstaller;
pub use nix::NixFlakeInstaller;
pub use os_packages::OsPackageInstaller;
pub use pipeline::{InstallationPipeline, PipelineReport, SkipReason};
pub use python::PythonInstaller;

use crate::context::RepoContext;
use crate::error::Result;
use crate::runner::CommandRunner;
use std::collections::BTreeSet;
use std::fmt;

/// Installer priority. Variants are declared from highest to lowest
/// priority, so `a < b` means `a` outranks `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    OsPackages,
    Nix,
    Python,
    Makefile,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::OsPackages, Layer::Nix, Layer::Python, Layer::Makefile];

    /// True when `self` takes precedence over `other`.
    pub fn outranks(self, other: Layer) -> bool {
        self < other
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::OsPackages => "os-packages",
            Layer::Nix => "nix",
            Layer::Python => "python",
            Layer::Makefile => "makefile",
        };
        f.write_str(name)
    }
}

/// Name of something an installer provides, e.g. `cli`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability(String);

impl Capability {
    pub const CLI: &'static str = "cli";
    pub const PYTHON_RUNTIME: &'static str = "python-runtime";
    pub const MAKE_INSTALL: &'static str = "make-install";
    pub const NIX_FLAKE: &'static str = "nix-flake";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Capability {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One installation mechanism.
pub trait Installer: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    fn layer(&self) -> Layer;

    /// Whether this mechanism applies to the repository on this system.
    fn supports(&self, ctx: &RepoContext) -> bool;

    /// What running this installer would provide.
    fn discover_capabilities(&self, ctx: &RepoContext) -> BTreeSet<Capability>;

    /// Install. Failures are fatal for the repository.
    fn run(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<()>;
}

/// Answers whether a program is available on `PATH`.
pub trait ToolLocator: Send + Sync {
    fn has(&self, program: &str) -> bool;
}

/// [`ToolLocator`] backed by the `which` crate.
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn has(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// The installers used in production, in priority order.
pub fn default_installers() -> Vec<Box<dyn Installer>> {
    vec![
        Box::new(OsPackageInstaller::new(Box::new(PathLocator))),
        Box::new(NixFlakeInstaller::from_env(Box::new(PathLocator))),
        Box::new(PythonInstaller::from_env()),
        Box::new(MakefileInstaller),
    ]
}
