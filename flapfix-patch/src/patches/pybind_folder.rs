use camino::Utf8Path;

use super::SourcePatch;
use crate::error::PatchError;
use crate::tree::SourceTree;

const TARGET: &str = "compile.py";

/// The rewrite is anchored on the literal function header and its final
/// return. If upstream reformats either line the patch fails loudly
/// instead of guessing (see [`PatchError::AnchorMissing`]).
const START_ANCHOR: &str = "def getPybindFolder():";
const END_ANCHOR: &str = "return folder";

/// Distinctive line of the corrected body; its presence means the fix is
/// already in place.
const APPLIED_MARKER: &str = "pybind11 headers not found at";

const REPLACEMENT: &str = r#"def getPybindFolder():
    try:
        import pybind11
    except ImportError:
        raise RuntimeError("pybind11 is not installed for this interpreter; "
                           "run 'pip install pybind11' and retry")
    folder = os.path.join(os.path.dirname(pybind11.__file__), "include")
    header = os.path.join(folder, "pybind11", "pybind11.h")
    if not os.path.isfile(header):
        raise RuntimeError("pybind11 headers not found at " + header)
    return folder"#;

/// Replaces `compile.py`'s pybind11 header lookup with one that resolves
/// the headers bundled with the installed `pybind11` module.
pub struct PybindFolderPatch;

impl PybindFolderPatch {
    /// Pure rewrite, exposed for fixture tests. All-or-nothing: the result
    /// is built on a copy, so a missing anchor leaves nothing half-written.
    pub fn transform(contents: &str) -> Result<String, PatchError> {
        let start = contents
            .find(START_ANCHOR)
            .ok_or(PatchError::AnchorMissing {
                patch: "nextflap.pybind_folder",
                anchor: START_ANCHOR,
                file: TARGET.into(),
            })?;

        let end_rel = contents[start..]
            .find(END_ANCHOR)
            .ok_or(PatchError::AnchorMissing {
                patch: "nextflap.pybind_folder",
                anchor: END_ANCHOR,
                file: TARGET.into(),
            })?;
        let end = start + end_rel + END_ANCHOR.len();

        let mut out = String::with_capacity(contents.len() + REPLACEMENT.len());
        out.push_str(&contents[..start]);
        out.push_str(REPLACEMENT);
        out.push_str(&contents[end..]);
        Ok(out)
    }
}

impl SourcePatch for PybindFolderPatch {
    fn id(&self) -> &'static str {
        "nextflap.pybind_folder"
    }

    fn title(&self) -> &'static str {
        "Resolve pybind11 headers from the installed module in compile.py"
    }

    fn target(&self) -> &Utf8Path {
        Utf8Path::new(TARGET)
    }

    fn is_applied(&self, tree: &dyn SourceTree) -> Result<bool, PatchError> {
        let contents = tree.read_to_string(self.target())?;
        Ok(contents.contains(APPLIED_MARKER))
    }

    fn apply(&self, tree: &mut dyn SourceTree) -> Result<(), PatchError> {
        let contents = tree.read_to_string(self.target())?;
        tree.write(self.target(), &Self::transform(&contents)?)
    }
}
