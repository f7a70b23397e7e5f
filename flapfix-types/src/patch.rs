use serde::{Deserialize, Serialize};

/// Outcome of running one source patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOutcome {
    /// Stable patch identifier, e.g. "nextflap.include_path".
    pub id: String,

    pub title: String,

    pub status: PatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// The idempotence predicate reported the fix already present; nothing
    /// was written.
    AlreadyApplied,

    /// The patch was applied in this run.
    Applied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PatchStatus::AlreadyApplied).unwrap(),
            "\"already_applied\""
        );
        assert_eq!(
            serde_json::to_string(&PatchStatus::Applied).unwrap(),
            "\"applied\""
        );
    }
}
