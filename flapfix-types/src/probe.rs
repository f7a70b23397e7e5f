use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of probing the target environment.
///
/// One [`Check`] per prerequisite, in the order they were evaluated. The
/// report is deliberately tolerant on the way back in: unknown fields are
/// ignored and optional fields may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Interpreter command the probe ran against (e.g. "python3").
    pub interpreter: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub isolation: Isolation,

    #[serde(default)]
    pub checks: Vec<Check>,
}

impl ProbeReport {
    /// Overall verdict: the worst status among all checks.
    pub fn status(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass)
    }

    /// Checks that failed outright.
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
    }

    pub fn is_pass(&self) -> bool {
        self.status() != CheckStatus::Fail
    }
}

/// A single prerequisite check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    /// Stable identifier, e.g. "toolchain.cxx" or "solver.dev_files".
    pub id: String,

    pub title: String,

    pub status: CheckStatus,

    /// What was actually found (version string, path, error output).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Actionable fix for a failing check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Check {
    pub fn pass(id: &str, title: &str, detail: impl Into<Option<String>>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            status: CheckStatus::Pass,
            detail: detail.into(),
            remediation: None,
        }
    }

    pub fn fail(id: &str, title: &str, detail: impl Into<Option<String>>, remediation: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            status: CheckStatus::Fail,
            detail: detail.into(),
            remediation: Some(remediation.to_string()),
        }
    }

    pub fn warn(id: &str, title: &str, detail: impl Into<Option<String>>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            status: CheckStatus::Warn,
            detail: detail.into(),
            remediation: None,
        }
    }
}

/// Ordered so that `max()` yields the worst outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    #[default]
    Pass,
    Warn,
    Fail,
}

/// Environment-isolation status of the target interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Isolation {
    /// An active virtualenv (`VIRTUAL_ENV`).
    Venv { prefix: Utf8PathBuf },

    /// An active conda environment (`CONDA_PREFIX`).
    Conda { prefix: Utf8PathBuf },

    /// No isolation marker found; installing would touch the system
    /// interpreter.
    #[default]
    System,
}

impl Isolation {
    pub fn is_isolated(&self) -> bool {
        !matches!(self, Isolation::System)
    }
}
