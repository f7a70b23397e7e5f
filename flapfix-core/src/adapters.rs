//! Process-backed implementations of the port traits.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};

use flapfix_probe::Prober;
use flapfix_solver::{PkgConfig, SolverError, SolverInstall};
use flapfix_types::ProbeReport;

use crate::pipeline::BUILD_ENTRY;
use crate::ports::{BuildPort, ConfirmPort, InstallPorts, PipPort, ProbePort, PythonPort, SolverPort};
use crate::settings::InstallSettings;

/// [`ProbePort`] backed by [`flapfix_probe::Prober`].
pub struct SystemProbe {
    prober: Prober,
}

impl SystemProbe {
    pub fn from_settings(settings: &InstallSettings) -> Self {
        Self {
            prober: Prober::new(&settings.python)
                .with_cxx(&settings.cxx)
                .with_pkg_config(&settings.pkg_config),
        }
    }
}

impl ProbePort for SystemProbe {
    fn probe(&self) -> ProbeReport {
        self.prober.probe()
    }
}

/// [`ConfirmPort`] reading one line from the terminal.
pub struct TerminalConfirm;

impl ConfirmPort for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool> {
        eprint!("{prompt}");
        std::io::stderr().flush().context("flush prompt")?;

        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("read confirmation")?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// [`PythonPort`] shelling out to the configured interpreter.
pub struct SystemPython {
    python: String,
}

impl SystemPython {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
        }
    }
}

impl PythonPort for SystemPython {
    fn site_packages(&self) -> anyhow::Result<Utf8PathBuf> {
        let output = Command::new(&self.python)
            .args(["-c", "import sysconfig; print(sysconfig.get_paths()['purelib'])"])
            .output()
            .with_context(|| format!("run '{}'", self.python))?;
        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                self.python,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path.is_empty() {
            bail!("'{}' reported an empty site-packages path", self.python);
        }
        Ok(Utf8PathBuf::from(path))
    }

    fn check_import(&self, module: &str, symbol: &str) -> anyhow::Result<()> {
        let code = format!("from {module} import {symbol}");
        let output = Command::new(&self.python)
            .args(["-c", &code])
            .output()
            .with_context(|| format!("run '{}'", self.python))?;
        if !output.status.success() {
            bail!(
                "import failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// [`PipPort`] via `<python> -m pip`, so the target interpreter's own pip
/// is always the one doing the installing.
pub struct SystemPip {
    python: String,
}

impl SystemPip {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
        }
    }
}

impl PipPort for SystemPip {
    fn install(&self, packages: &[&str]) -> anyhow::Result<()> {
        // Inherit stdio: pip's progress output is the user feedback here.
        let status = Command::new(&self.python)
            .args(["-m", "pip", "install"])
            .args(packages)
            .status()
            .with_context(|| format!("run '{} -m pip install'", self.python))?;
        if !status.success() {
            bail!("pip install exited with {status}");
        }
        Ok(())
    }

    fn uninstall(&self, package: &str) -> anyhow::Result<()> {
        let output = Command::new(&self.python)
            .args(["-m", "pip", "uninstall", "-y", package])
            .output()
            .with_context(|| format!("run '{} -m pip uninstall'", self.python))?;
        if !output.status.success() {
            bail!(
                "pip uninstall exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// [`SolverPort`] backed by pkg-config.
pub struct PkgConfigSolver {
    pkg: PkgConfig,
}

impl PkgConfigSolver {
    pub fn from_settings(settings: &InstallSettings) -> Self {
        Self {
            pkg: PkgConfig::with_program(&settings.pkg_config),
        }
    }
}

impl SolverPort for PkgConfigSolver {
    fn discover(&self) -> Result<SolverInstall, SolverError> {
        SolverInstall::discover(&self.pkg)
    }
}

/// [`BuildPort`] running `<python> compile.py` inside the source tree,
/// with the solver prefix piped as the single line of stdin.
pub struct CompileBuild {
    python: String,
}

impl CompileBuild {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
        }
    }
}

impl BuildPort for CompileBuild {
    fn build(&self, source_dir: &Utf8Path, solver_prefix: &Utf8Path) -> anyhow::Result<()> {
        let mut child = Command::new(&self.python)
            .arg(BUILD_ENTRY)
            .current_dir(source_dir)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn '{} {}'", self.python, BUILD_ENTRY))?;

        let mut stdin = child.stdin.take().context("open stdin of the build step")?;
        stdin
            .write_all(format!("{solver_prefix}\n").as_bytes())
            .context("pipe solver prefix to the build step")?;
        drop(stdin);

        let status = child.wait().context("wait for the build step")?;
        if !status.success() {
            bail!("{} exited with {status}", BUILD_ENTRY);
        }
        Ok(())
    }
}

/// All system adapters for one settings set, bundled.
pub struct SystemPorts {
    probe: SystemProbe,
    confirm: TerminalConfirm,
    python: SystemPython,
    pip: SystemPip,
    solver: PkgConfigSolver,
    build: CompileBuild,
}

impl SystemPorts {
    pub fn from_settings(settings: &InstallSettings) -> Self {
        Self {
            probe: SystemProbe::from_settings(settings),
            confirm: TerminalConfirm,
            python: SystemPython::new(&settings.python),
            pip: SystemPip::new(&settings.python),
            solver: PkgConfigSolver::from_settings(settings),
            build: CompileBuild::new(&settings.python),
        }
    }

    pub fn as_ports(&self) -> InstallPorts<'_> {
        InstallPorts {
            probe: &self.probe,
            confirm: &self.confirm,
            python: &self.python,
            pip: &self.pip,
            solver: &self.solver,
            build: &self.build,
        }
    }
}
