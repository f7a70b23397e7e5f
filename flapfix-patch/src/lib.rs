//! Source-compatibility patch engine for the NextFLAP tree.
//!
//! Responsibilities:
//! - Hold the fixed list of known incompatibilities as declarative
//!   {idempotence predicate, transform} pairs.
//! - Apply them in order so the tree ends up fully patched; re-running the
//!   engine on a patched tree writes nothing.
//! - Generate a unified diff preview without touching the tree.

mod error;
mod patches;
mod tree;

pub use error::PatchError;
pub use patches::{
    IncludePathPatch, PybindFolderPatch, ShimPresencePatch, SourcePatch, builtin_patches,
};
pub use tree::{FsTree, MemOverlay, SourceTree};

use diffy::PatchFormatter;
use flapfix_types::{PatchOutcome, PatchStatus};
use tracing::{debug, info};

/// Run every patch against the tree.
///
/// After this returns `Ok`, the tree is in the fully-patched state
/// regardless of where it started.
pub fn apply_patches(
    tree: &mut dyn SourceTree,
    patches: &[Box<dyn SourcePatch>],
) -> Result<Vec<PatchOutcome>, PatchError> {
    let mut outcomes = Vec::with_capacity(patches.len());

    for patch in patches {
        let status = if patch.is_applied(tree)? {
            debug!(patch = patch.id(), "already applied");
            PatchStatus::AlreadyApplied
        } else {
            patch.apply(tree)?;
            info!(patch = patch.id(), file = %patch.target(), "applied");
            PatchStatus::Applied
        };

        outcomes.push(PatchOutcome {
            id: patch.id().to_string(),
            title: patch.title().to_string(),
            status,
        });
    }

    Ok(outcomes)
}

/// Unified diff of what [`apply_patches`] would change, computed on an
/// in-memory overlay; the tree itself is not written.
pub fn preview_patches(
    base: &dyn SourceTree,
    patches: &[Box<dyn SourcePatch>],
) -> Result<String, PatchError> {
    let mut overlay = MemOverlay::new(base);
    apply_patches(&mut overlay, patches)?;

    let formatter = PatchFormatter::new();
    let mut out = String::new();
    for (path, new) in overlay.changes() {
        let old = if base.exists(path) {
            base.read_to_string(path)?
        } else {
            String::new()
        };
        if &old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
        let patch = diffy::create_patch(&old, new);
        out.push_str(&formatter.fmt_patch(&patch).to_string());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    Ok(out)
}
