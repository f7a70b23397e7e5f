//! Z3 discovery and build-prefix resolution.
//!
//! The NextFLAP build script expects a single "prefix" directory holding
//! `lib/libz3.so*` and `include/z3*.h`. Distribution packages frequently
//! split those across the filesystem, so when the configured prefix does
//! not carry the shared library directly under `lib/`, a scratch prefix is
//! synthesized from symlinks and header copies. That scratch layout lives
//! exactly as long as one build invocation.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Conventional location of the Z3 headers when the packaged prefix does
/// not expose them.
const SYSTEM_INCLUDE_DIR: &str = "/usr/include";

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(
        "Z3 is not discoverable via pkg-config; install the Z3 development \
         package (e.g. 'apt install libz3-dev')"
    )]
    NotInstalled,

    #[error("pkg-config reported an empty '{0}' variable for z3")]
    EmptyVariable(&'static str),

    #[error("no libz3 shared library found under {0}")]
    NoSharedLibrary(Utf8PathBuf),

    #[error("synthesize solver prefix: {0}")]
    Io(#[from] std::io::Error),
}

/// Thin wrapper around the `pkg-config` binary, injectable for tests.
#[derive(Debug, Clone)]
pub struct PkgConfig {
    program: String,
}

impl Default for PkgConfig {
    fn default() -> Self {
        Self {
            program: "pkg-config".to_string(),
        }
    }
}

impl PkgConfig {
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn exists(&self, module: &str) -> bool {
        Command::new(&self.program)
            .args(["--exists", module])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn variable(&self, module: &str, variable: &str) -> Option<String> {
        let output = Command::new(&self.program)
            .arg(format!("--variable={variable}"))
            .arg(module)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() { None } else { Some(value) }
    }
}

/// Where the installed Z3 actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverInstall {
    pub prefix: Utf8PathBuf,
    pub libdir: Utf8PathBuf,
}

impl SolverInstall {
    /// Query pkg-config for the installed Z3. Fatal when the module is not
    /// discoverable at all; synthesis is never attempted in that case.
    pub fn discover(pkg: &PkgConfig) -> Result<Self, SolverError> {
        if !pkg.exists("z3") {
            return Err(SolverError::NotInstalled);
        }

        let prefix = pkg
            .variable("z3", "prefix")
            .ok_or(SolverError::EmptyVariable("prefix"))?;
        let libdir = pkg
            .variable("z3", "libdir")
            .ok_or(SolverError::EmptyVariable("libdir"))?;

        debug!(%prefix, %libdir, "discovered z3 install");

        Ok(Self {
            prefix: Utf8PathBuf::from(prefix),
            libdir: Utf8PathBuf::from(libdir),
        })
    }
}

/// The prefix handed to the external build step.
///
/// `Synthesized` owns its scratch directory; dropping the value removes the
/// directory, so callers keep it alive across exactly one build invocation.
#[derive(Debug)]
pub enum BuildPrefix {
    /// The real install prefix already has the expected sublayout.
    Installed(Utf8PathBuf),

    /// Scratch layout assembled from symlinks and header copies.
    Synthesized(SynthesizedPrefix),
}

impl BuildPrefix {
    pub fn path(&self) -> &Utf8Path {
        match self {
            BuildPrefix::Installed(p) => p,
            BuildPrefix::Synthesized(s) => &s.path,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, BuildPrefix::Synthesized(_))
    }
}

#[derive(Debug)]
pub struct SynthesizedPrefix {
    path: Utf8PathBuf,
    // Held for its Drop; removing the TempDir removes the layout.
    _dir: TempDir,
}

impl SynthesizedPrefix {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Resolve the prefix the build step will receive.
///
/// If `<prefix>/lib/libz3.so*` matches, the install is usable as-is;
/// otherwise a scratch prefix is synthesized from the configured libdir.
pub fn resolve_build_prefix(install: &SolverInstall) -> Result<BuildPrefix, SolverError> {
    let direct = shared_libraries(&install.prefix.join("lib"));
    if !direct.is_empty() {
        debug!(prefix = %install.prefix, "z3 prefix usable as-is");
        return Ok(BuildPrefix::Installed(install.prefix.clone()));
    }

    let synthesized = synthesize_prefix(install, Utf8Path::new(SYSTEM_INCLUDE_DIR))?;
    Ok(BuildPrefix::Synthesized(synthesized))
}

/// Build the scratch prefix: `lib/` symlinks to the real shared libraries,
/// `include/` best-effort copies of the system Z3 headers.
pub fn synthesize_prefix(
    install: &SolverInstall,
    headers_dir: &Utf8Path,
) -> Result<SynthesizedPrefix, SolverError> {
    let libs = shared_libraries(&install.libdir);
    if libs.is_empty() {
        return Err(SolverError::NoSharedLibrary(install.libdir.clone()));
    }

    let dir = TempDir::with_prefix("flapfix-z3-")?;
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|p| std::io::Error::other(format!("non-UTF-8 temp path: {}", p.display())))?;

    let lib_dir = path.join("lib");
    fs::create_dir_all(&lib_dir)?;
    for lib in &libs {
        let name = lib.file_name().expect("glob matches carry a file name");
        link_or_copy(lib, &lib_dir.join(name))?;
    }
    debug!(count = libs.len(), target = %lib_dir, "linked z3 shared libraries");

    let include_dir = path.join("include");
    fs::create_dir_all(&include_dir)?;
    for header in headers(headers_dir) {
        let name = header.file_name().expect("glob matches carry a file name");
        if let Err(e) = fs::copy(&header, include_dir.join(name)) {
            // Not all environments expose headers here; the bundled build
            // can still succeed without them.
            warn!(header = %header, error = %e, "could not copy z3 header");
        }
    }

    Ok(SynthesizedPrefix { path, _dir: dir })
}

fn shared_libraries(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    glob_utf8(&dir.join("libz3.so*"))
}

fn headers(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    glob_utf8(&dir.join("z3*.h"))
}

fn glob_utf8(pattern: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = glob::glob(pattern.as_str()) else {
        return Vec::new();
    };
    let mut out: Vec<Utf8PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter_map(|p| Utf8PathBuf::from_path_buf(p).ok())
        .collect();
    // Deterministic order matters for logging and tests.
    out.sort();
    out
}

#[cfg(unix)]
fn link_or_copy(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(from, to)
}

#[cfg(not(unix))]
fn link_or_copy(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    fs::copy(from, to).map(|_| ())
}
