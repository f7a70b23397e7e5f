//! CLI argument structs and their translation into pipeline settings.
//!
//! `FLAPFIX_PYTHON` is the one ambient configuration knob; an explicit
//! `--python` always wins over it, and everything below the CLI sees only
//! the resulting [`InstallSettings`].

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use flapfix_core::InstallSettings;

#[derive(Debug, Parser)]
pub struct InstallArgs {
    /// Interpreter command to install into.
    #[arg(long, env = "FLAPFIX_PYTHON", default_value = "python3")]
    pub python: String,

    /// Treat the environment as isolated even when no virtualenv or conda
    /// marker is present.
    #[arg(long, default_value_t = false)]
    pub assume_isolated: bool,

    /// Never prompt; answer "yes" where a prompt would appear.
    #[arg(long, short = 'y', default_value_t = false)]
    pub yes: bool,

    /// Local planner source tree, overriding the pip-installed package.
    #[arg(long)]
    pub source: Option<Utf8PathBuf>,

    /// C++ compiler command to probe for.
    #[arg(long, default_value = "g++")]
    pub cxx: String,

    /// pkg-config command used for Z3 discovery.
    #[arg(long, default_value = "pkg-config")]
    pub pkg_config: String,
}

impl InstallArgs {
    pub fn into_settings(self) -> InstallSettings {
        InstallSettings {
            python: self.python,
            assume_isolated: self.assume_isolated,
            assume_yes: self.yes,
            source: self.source,
            cxx: self.cxx,
            pkg_config: self.pkg_config,
        }
    }
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Interpreter command to probe.
    #[arg(long, env = "FLAPFIX_PYTHON", default_value = "python3")]
    pub python: String,

    /// C++ compiler command to probe for.
    #[arg(long, default_value = "g++")]
    pub cxx: String,

    /// pkg-config command used for Z3 discovery.
    #[arg(long, default_value = "pkg-config")]
    pub pkg_config: String,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl CheckArgs {
    pub fn into_settings(self) -> (InstallSettings, OutputFormat) {
        let format = self.format;
        let settings = InstallSettings {
            python: self.python,
            cxx: self.cxx,
            pkg_config: self.pkg_config,
            ..InstallSettings::default()
        };
        (settings, format)
    }
}

#[derive(Debug, Parser)]
pub struct PatchArgs {
    /// Source tree to patch (default: the pip-installed up_nextflap).
    #[arg(long)]
    pub source: Option<Utf8PathBuf>,

    /// Interpreter used to locate the pip-installed package.
    #[arg(long, env = "FLAPFIX_PYTHON", default_value = "python3")]
    pub python: String,

    /// Print the unified diff instead of writing changes.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
