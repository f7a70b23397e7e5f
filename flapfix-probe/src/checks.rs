use std::env;
use std::process::Command;

use camino::Utf8PathBuf;
use chrono::Utc;
use flapfix_types::{Check, Isolation, ProbeReport};
use tracing::debug;

/// Probes the target environment for everything the build needs.
///
/// Tool commands are injectable so tests can point them at scripts; the
/// defaults match what the NextFLAP build actually invokes.
#[derive(Debug, Clone)]
pub struct Prober {
    python: String,
    cxx: String,
    pkg_config: String,
}

impl Prober {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
            cxx: "g++".to_string(),
            pkg_config: "pkg-config".to_string(),
        }
    }

    pub fn with_cxx(mut self, cxx: &str) -> Self {
        self.cxx = cxx.to_string();
        self
    }

    pub fn with_pkg_config(mut self, pkg_config: &str) -> Self {
        self.pkg_config = pkg_config.to_string();
        self
    }

    /// Run all checks. Read-only: no path is mutated.
    pub fn probe(&self) -> ProbeReport {
        let isolation = isolation_from_env();

        let mut checks = Vec::new();
        checks.push(self.check_interpreter());
        checks.push(isolation_check(&isolation));
        checks.push(self.check_cxx());
        checks.push(self.check_solver_dev());

        ProbeReport {
            interpreter: self.python.clone(),
            started_at: Some(Utc::now()),
            isolation,
            checks,
        }
    }

    fn check_interpreter(&self) -> Check {
        match version_line(&self.python, &["--version"]) {
            Some(version) => Check::pass("python.interpreter", "Python interpreter", Some(version)),
            None => Check::fail(
                "python.interpreter",
                "Python interpreter",
                Some(format!("'{}' could not be run", self.python)),
                "install Python 3 or point FLAPFIX_PYTHON/--python at an interpreter",
            ),
        }
    }

    fn check_cxx(&self) -> Check {
        match version_line(&self.cxx, &["--version"]) {
            Some(version) => Check::pass("toolchain.cxx", "C++ compiler", Some(version)),
            None => Check::fail(
                "toolchain.cxx",
                "C++ compiler",
                Some(format!("'{}' could not be run", self.cxx)),
                "install a C++ compiler (e.g. 'apt install g++')",
            ),
        }
    }

    fn check_solver_dev(&self) -> Check {
        let exists = Command::new(&self.pkg_config)
            .args(["--exists", "z3"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if exists {
            let detail = version_line(&self.pkg_config, &["--modversion", "z3"])
                .map(|v| format!("z3 {}", v));
            Check::pass("solver.dev_files", "Z3 development files", detail)
        } else {
            Check::fail(
                "solver.dev_files",
                "Z3 development files",
                Some("pkg-config does not know the 'z3' module".to_string()),
                "install the Z3 development package (e.g. 'apt install libz3-dev')",
            )
        }
    }
}

fn isolation_check(isolation: &Isolation) -> Check {
    match isolation {
        Isolation::Venv { prefix } => Check::pass(
            "env.isolation",
            "Isolated environment",
            Some(format!("virtualenv at {}", prefix)),
        ),
        Isolation::Conda { prefix } => Check::pass(
            "env.isolation",
            "Isolated environment",
            Some(format!("conda env at {}", prefix)),
        ),
        Isolation::System => Check::warn(
            "env.isolation",
            "Isolated environment",
            Some("no virtualenv or conda environment is active".to_string()),
        ),
    }
}

/// Isolation status from the ambient process environment.
pub fn isolation_from_env() -> Isolation {
    isolation_from_vars(
        env::var("VIRTUAL_ENV").ok().as_deref(),
        env::var("CONDA_PREFIX").ok().as_deref(),
    )
}

/// Presence of either marker counts as isolated; a virtualenv wins when
/// both are set (conda often leaves CONDA_PREFIX behind in nested shells).
pub fn isolation_from_vars(virtual_env: Option<&str>, conda_prefix: Option<&str>) -> Isolation {
    if let Some(p) = virtual_env.filter(|p| !p.is_empty()) {
        return Isolation::Venv {
            prefix: Utf8PathBuf::from(p),
        };
    }
    if let Some(p) = conda_prefix.filter(|p| !p.is_empty()) {
        return Isolation::Conda {
            prefix: Utf8PathBuf::from(p),
        };
    }
    Isolation::System
}

/// First line of `<program> <args>` output, from stdout or stderr
/// (python2 famously printed its version to stderr).
fn version_line(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        debug!(program, code = ?output.status.code(), "version query failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())?;
    Some(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapfix_types::CheckStatus;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn isolation_prefers_venv_over_conda() {
        let iso = isolation_from_vars(Some("/venvs/a"), Some("/conda/b"));
        assert_eq!(
            iso,
            Isolation::Venv {
                prefix: Utf8PathBuf::from("/venvs/a")
            }
        );
    }

    #[test]
    fn isolation_falls_back_to_conda() {
        let iso = isolation_from_vars(None, Some("/conda/b"));
        assert_eq!(
            iso,
            Isolation::Conda {
                prefix: Utf8PathBuf::from("/conda/b")
            }
        );
    }

    #[test]
    fn empty_markers_mean_system() {
        assert_eq!(isolation_from_vars(Some(""), Some("")), Isolation::System);
        assert_eq!(isolation_from_vars(None, None), Isolation::System);
    }

    #[test]
    fn system_isolation_is_a_warning_not_a_failure() {
        let check = isolation_check(&Isolation::System);
        assert_eq!(check.status, CheckStatus::Warn);
        let check = isolation_check(&Isolation::Venv {
            prefix: Utf8PathBuf::from("/v"),
        });
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn missing_program_fails_interpreter_check() {
        let prober = Prober::new("flapfix-no-such-interpreter");
        let check = prober.check_interpreter();
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.remediation.is_some());
    }

    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn version_line_reads_stdout_then_stderr() {
        let temp = tempfile::TempDir::new().unwrap();
        let quiet = write_script(temp.path(), "quiet", "#!/bin/sh\necho 'tool 1.2.3' >&2\n");
        assert_eq!(
            version_line(&quiet, &["--version"]),
            Some("tool 1.2.3".to_string())
        );

        let loud = write_script(temp.path(), "loud", "#!/bin/sh\necho 'tool 9.9'\n");
        assert_eq!(
            version_line(&loud, &["--version"]),
            Some("tool 9.9".to_string())
        );
    }

    #[test]
    fn failing_status_yields_no_version() {
        let temp = tempfile::TempDir::new().unwrap();
        let bad = write_script(temp.path(), "bad", "#!/bin/sh\necho oops\nexit 3\n");
        assert_eq!(version_line(&bad, &["--version"]), None);
    }

    #[test]
    fn solver_check_with_stub_pkg_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let ok = write_script(
            temp.path(),
            "pkg-config-ok",
            "#!/bin/sh\nif [ \"$1\" = \"--exists\" ]; then exit 0; fi\necho 4.12.2\n",
        );
        let prober = Prober::new("python3").with_pkg_config(&ok);
        let check = prober.check_solver_dev();
        assert_eq!(check.status, CheckStatus::Pass);
        assert_eq!(check.detail.as_deref(), Some("z3 4.12.2"));

        let missing = write_script(temp.path(), "pkg-config-missing", "#!/bin/sh\nexit 1\n");
        let prober = Prober::new("python3").with_pkg_config(&missing);
        let check = prober.check_solver_dev();
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.remediation.as_deref().unwrap().contains("libz3-dev"));
    }
}
