//! The install pipeline, extracted from the CLI.
//!
//! Control flows linearly through the stages exactly once; the first
//! fatal condition aborts the whole run. The scratch build directory is
//! owned by [`RunContext`] and removed on every exit path, including
//! unwinding.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use flapfix_patch::{FsTree, PatchError, apply_patches, builtin_patches};
use flapfix_solver::{SolverError, resolve_build_prefix};
use flapfix_types::{Check, PatchOutcome, ProbeReport};

use crate::ports::InstallPorts;
use crate::settings::InstallSettings;

/// Python dependencies installed before the build, in this order.
/// `up-nextflap` doubles as the source carrier: its installed package
/// directory is the tree that gets patched and compiled.
pub const PY_DEPENDENCIES: [&str; 3] = ["unified-planning", "pybind11", "up-nextflap"];

/// Previously installed package that would shadow the fresh build.
pub const CONFLICTING_PACKAGE: &str = "up-nextflap";

/// Build entry point inside the patched source tree.
pub const BUILD_ENTRY: &str = "compile.py";

/// Package directory created under site-packages.
pub const PACKAGE_DIR: &str = "up_nextflap";

/// The native extension the build step must produce.
pub const ARTIFACT_NAME: &str = "nextflap.so";

/// Shim sources copied next to the artifact.
pub const SHIM_SOURCES: [&str; 2] = ["__init__.py", "nextflap.py"];

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("prerequisite checks failed:\n{}", format_failures(.0))]
    Prerequisites(Vec<Check>),

    #[error("no isolated Python environment is active; aborting at the operator's request")]
    ConfirmationDeclined,

    #[error("confirmation prompt failed: {0}")]
    Confirm(#[source] anyhow::Error),

    #[error("install Python dependencies: {0}")]
    Dependencies(#[source] anyhow::Error),

    #[error("create scratch build directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("query site-packages from '{python}': {source}")]
    SitePackages {
        python: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "planner source tree not found at {0}; pass --source or let pip \
         install up-nextflap first"
    )]
    SourceMissing(Utf8PathBuf),

    #[error("stage planner sources into the scratch directory: {0}")]
    Stage(#[source] anyhow::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("native build step failed: {0}")]
    Build(#[source] anyhow::Error),

    #[error("build step reported success but {0} was not created")]
    ArtifactMissing(Utf8PathBuf),

    #[error("install package files into {target}: {source}")]
    Packaging {
        target: Utf8PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("verification import of {module}.{symbol} failed: {source}")]
    Verify {
        module: String,
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
}

fn format_failures(checks: &[Check]) -> String {
    let mut out = String::new();
    for check in checks {
        out.push_str(&format!("  - {}: {}", check.id, check.title));
        if let Some(detail) = &check.detail {
            out.push_str(&format!(" ({detail})"));
        }
        if let Some(remediation) = &check.remediation {
            out.push_str(&format!("\n    fix: {remediation}"));
        }
        out.push('\n');
    }
    out
}

/// What a successful run produced.
#[derive(Debug)]
pub struct InstallOutcome {
    pub probe: ProbeReport,
    pub patches: Vec<PatchOutcome>,

    /// Whether the build ran against a synthesized solver prefix.
    pub synthesized_prefix: bool,

    /// Final package directory under site-packages.
    pub installed_to: Utf8PathBuf,
}

/// Paths owned by one run. Dropping the context removes the scratch
/// directory, so cleanup fires on success, on error returns, and on
/// unwinding alike.
struct RunContext {
    build_dir: Utf8PathBuf,
    _scratch: TempDir,
}

impl RunContext {
    fn create() -> Result<Self, InstallError> {
        let scratch = TempDir::with_prefix("flapfix-build-").map_err(InstallError::Scratch)?;
        let root = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf()).map_err(|p| {
            InstallError::Scratch(std::io::Error::other(format!(
                "non-UTF-8 temp path: {}",
                p.display()
            )))
        })?;
        Ok(Self {
            build_dir: root.join("build"),
            _scratch: scratch,
        })
    }
}

/// Run the whole install: probe, dependencies, stage, patch, build,
/// package, verify. Fail-fast at every stage.
pub fn run_install(
    settings: &InstallSettings,
    ports: &InstallPorts<'_>,
) -> Result<InstallOutcome, InstallError> {
    let ctx = RunContext::create()?;
    debug!(build_dir = %ctx.build_dir, "scratch directory created");

    // 1. Probe. Read-only; nothing has been mutated if we abort here.
    let report = ports.probe.probe();
    let failures: Vec<Check> = report.failures().cloned().collect();
    if !failures.is_empty() {
        return Err(InstallError::Prerequisites(failures));
    }
    info!(interpreter = %report.interpreter, "prerequisites satisfied");

    if !report.isolation.is_isolated() && !settings.assume_isolated {
        if settings.assume_yes {
            info!("no isolated environment detected; proceeding (--yes)");
        } else {
            let proceed = ports
                .confirm
                .confirm(
                    "No virtualenv or conda environment is active; install into \
                     the system interpreter? [y/N] ",
                )
                .map_err(InstallError::Confirm)?;
            if !proceed {
                return Err(InstallError::ConfirmationDeclined);
            }
        }
    }

    // 2. Python dependencies. Also fetches the planner sources.
    info!(packages = ?PY_DEPENDENCIES, "installing Python dependencies");
    ports
        .pip
        .install(&PY_DEPENDENCIES)
        .map_err(InstallError::Dependencies)?;

    // 3. Resolve and stage the source tree.
    let site_packages = ports
        .python
        .site_packages()
        .map_err(|e| InstallError::SitePackages {
            python: settings.python.clone(),
            source: e,
        })?;
    debug!(%site_packages, "resolved site-packages");

    let fetched = site_packages.join(PACKAGE_DIR);
    let source = settings.source.clone().unwrap_or_else(|| fetched.clone());
    if !source.exists() {
        return Err(InstallError::SourceMissing(source));
    }

    copy_tree(&source, &ctx.build_dir).map_err(InstallError::Stage)?;
    info!(from = %source, to = %ctx.build_dir, "staged planner sources");

    // 4. Patch the staged tree.
    let mut tree = FsTree::new(ctx.build_dir.clone());
    let patches = apply_patches(&mut tree, &builtin_patches(fetched.join("nextflap.py")))?;
    for outcome in &patches {
        debug!(patch = %outcome.id, status = ?outcome.status, "patch outcome");
    }

    // 5. Locate Z3 and run the build. The synthesized prefix (if any) lives
    // exactly as long as this block.
    let solver = ports.solver.discover()?;
    let synthesized_prefix = {
        let prefix = resolve_build_prefix(&solver)?;
        if prefix.is_synthesized() {
            info!(prefix = %prefix.path(), "synthesized solver prefix for the build");
        }

        info!(entry = BUILD_ENTRY, "running native build");
        ports
            .build
            .build(&ctx.build_dir, prefix.path())
            .map_err(InstallError::Build)?;

        // The artifact gate: a zero exit with no artifact is still a failure.
        let artifact = ctx.build_dir.join(ARTIFACT_NAME);
        if !artifact.exists() {
            return Err(InstallError::ArtifactMissing(artifact));
        }
        prefix.is_synthesized()
    };

    // 6. Remove any conflicting pip install; absence is not an error.
    if let Err(e) = ports.pip.uninstall(CONFLICTING_PACKAGE) {
        warn!(package = CONFLICTING_PACKAGE, error = %e, "uninstall failed; continuing");
    }

    // 7. Package into site-packages.
    let target = site_packages.join(PACKAGE_DIR);
    install_package(&ctx.build_dir, &target).map_err(|e| InstallError::Packaging {
        target: target.clone(),
        source: e,
    })?;
    info!(target = %target, "installed package files");

    // 8. Final gate: the package must import.
    ports
        .python
        .check_import(PACKAGE_DIR, "NextFLAPImpl")
        .map_err(|e| InstallError::Verify {
            module: PACKAGE_DIR.to_string(),
            symbol: "NextFLAPImpl".to_string(),
            source: e,
        })?;
    info!("verification import succeeded");

    Ok(InstallOutcome {
        probe: report,
        patches,
        synthesized_prefix,
        installed_to: target,
    })
    // ctx drops here (and on every error path above): scratch is removed.
}

/// Copy the shim sources and the artifact into the target package
/// directory, overwriting existing copies.
fn install_package(build_dir: &Utf8Path, target: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(target)?;
    for name in SHIM_SOURCES {
        fs::copy(build_dir.join(name), target.join(name))?;
    }
    fs::copy(build_dir.join(ARTIFACT_NAME), target.join(ARTIFACT_NAME))?;
    Ok(())
}

/// Recursive copy of `src` into `dst` (created as needed).
fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(src.as_std_path()).follow_links(true) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src.as_std_path())?;
        let target = dst.as_std_path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapfix_types::CheckStatus;
    use pretty_assertions::assert_eq;

    fn utf8(p: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(p.to_path_buf()).expect("utf8")
    }

    #[test]
    fn copy_tree_preserves_nested_layout() {
        let temp = TempDir::new().unwrap();
        let root = utf8(temp.path());
        let src = root.join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested/b.txt"), "b").unwrap();

        let dst = root.join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn scratch_directory_is_removed_on_drop() {
        let ctx = RunContext::create().unwrap();
        let build_dir = ctx.build_dir.clone();
        let scratch = build_dir.parent().unwrap().to_path_buf();
        assert!(scratch.exists());
        drop(ctx);
        assert!(!scratch.exists());
    }

    #[test]
    fn failure_formatting_includes_remediation() {
        let checks = vec![Check {
            id: "toolchain.cxx".to_string(),
            title: "C++ compiler".to_string(),
            status: CheckStatus::Fail,
            detail: Some("'g++' could not be run".to_string()),
            remediation: Some("install a C++ compiler".to_string()),
        }];
        let text = format_failures(&checks);
        assert!(text.contains("toolchain.cxx"));
        assert!(text.contains("fix: install a C++ compiler"));
    }
}
