use camino::{Utf8Path, Utf8PathBuf};

use crate::error::PatchError;
use crate::tree::SourceTree;

mod include_path;
mod pybind_folder;
mod shim_presence;

pub use include_path::IncludePathPatch;
pub use pybind_folder::PybindFolderPatch;
pub use shim_presence::ShimPresencePatch;

/// One known incompatibility: an idempotence predicate plus a transform.
///
/// Contract: `apply` may assume `is_applied` just returned `false`, and
/// after a successful `apply` the predicate must return `true`. Applying to
/// an already-patched tree must never corrupt it.
pub trait SourcePatch {
    /// Stable identifier, e.g. "nextflap.include_path".
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// File the patch inspects, relative to the tree root.
    fn target(&self) -> &Utf8Path;

    fn is_applied(&self, tree: &dyn SourceTree) -> Result<bool, PatchError>;

    fn apply(&self, tree: &mut dyn SourceTree) -> Result<(), PatchError>;
}

/// The fixed patch list, in application order.
///
/// `shim_sibling` is the absolute path of a known-good copy of the shim
/// module (normally the pip-installed `up_nextflap/nextflap.py`).
pub fn builtin_patches(shim_sibling: Utf8PathBuf) -> Vec<Box<dyn SourcePatch>> {
    vec![
        Box::new(IncludePathPatch),
        Box::new(PybindFolderPatch),
        Box::new(ShimPresencePatch::new(shim_sibling)),
    ]
}
