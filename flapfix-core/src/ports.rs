//! Port traits abstracting all external collaborators away from the
//! pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use flapfix_solver::{SolverError, SolverInstall};
use flapfix_types::ProbeReport;

/// Environment prerequisite checks.
pub trait ProbePort {
    fn probe(&self) -> ProbeReport;
}

/// Interactive confirmation ("no isolated environment, continue?").
pub trait ConfirmPort {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool>;
}

/// Interpreter queries and fresh-process imports.
pub trait PythonPort {
    /// The interpreter's primary site-packages directory.
    fn site_packages(&self) -> anyhow::Result<Utf8PathBuf>;

    /// Import `symbol` from `module` in a fresh interpreter process.
    fn check_import(&self, module: &str, symbol: &str) -> anyhow::Result<()>;
}

/// The package manager.
pub trait PipPort {
    fn install(&self, packages: &[&str]) -> anyhow::Result<()>;

    /// Callers tolerate failure here; a package that was never installed is
    /// not an error worth stopping for.
    fn uninstall(&self, package: &str) -> anyhow::Result<()>;
}

/// Z3 install discovery.
pub trait SolverPort {
    fn discover(&self) -> Result<SolverInstall, SolverError>;
}

/// The external native build entry point.
pub trait BuildPort {
    /// Run the build inside `source_dir`, handing it the solver prefix as
    /// its single line of stdin. Blocking, single-shot, no retry.
    fn build(&self, source_dir: &Utf8Path, solver_prefix: &Utf8Path) -> anyhow::Result<()>;
}

/// All ports the install pipeline needs, bundled to keep signatures flat.
pub struct InstallPorts<'a> {
    pub probe: &'a dyn ProbePort,
    pub confirm: &'a dyn ConfirmPort,
    pub python: &'a dyn PythonPort,
    pub pip: &'a dyn PipPort,
    pub solver: &'a dyn SolverPort,
    pub build: &'a dyn BuildPort,
}
