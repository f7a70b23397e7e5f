//! Clap-free settings for the install pipeline.

use camino::Utf8PathBuf;

/// Explicit configuration for an install run.
///
/// Everything the original environment-variable plumbing expressed is a
/// field here; the CLI translates flags and `FLAPFIX_PYTHON` into this
/// struct and nothing below it reads the ambient environment (isolation
/// markers excepted, which the prober reports).
#[derive(Debug, Clone)]
pub struct InstallSettings {
    /// Interpreter command to install into (e.g. "python3").
    pub python: String,

    /// Treat the environment as isolated regardless of detection.
    pub assume_isolated: bool,

    /// Non-interactive mode: never prompt, answer "yes" where a prompt
    /// would appear.
    pub assume_yes: bool,

    /// Local planner source tree, overriding the pip-installed package.
    pub source: Option<Utf8PathBuf>,

    /// C++ compiler command probed for.
    pub cxx: String,

    /// pkg-config command used for Z3 discovery.
    pub pkg_config: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            assume_isolated: false,
            assume_yes: false,
            source: None,
            cxx: "g++".to_string(),
            pkg_config: "pkg-config".to_string(),
        }
    }
}
