use camino::Utf8Path;

use super::SourcePatch;
use crate::error::PatchError;
use crate::tree::SourceTree;

const TARGET: &str = "nextflap.cpp";

/// The binding translation unit includes the pybind11 umbrella header by
/// its bare name; the header actually lives one directory down inside the
/// pybind11 include tree.
const WRONG_INCLUDE: &str = "#include <pybind11.h>";
const RIGHT_INCLUDE: &str = "#include <pybind11/pybind11.h>";

pub struct IncludePathPatch;

impl IncludePathPatch {
    /// Pure rewrite, exposed for fixture tests.
    pub fn transform(contents: &str) -> String {
        contents.replace(WRONG_INCLUDE, RIGHT_INCLUDE)
    }
}

impl SourcePatch for IncludePathPatch {
    fn id(&self) -> &'static str {
        "nextflap.include_path"
    }

    fn title(&self) -> &'static str {
        "Fix pybind11 include directive in nextflap.cpp"
    }

    fn target(&self) -> &Utf8Path {
        Utf8Path::new(TARGET)
    }

    fn is_applied(&self, tree: &dyn SourceTree) -> Result<bool, PatchError> {
        let contents = tree.read_to_string(self.target())?;
        Ok(!contents.contains(WRONG_INCLUDE))
    }

    fn apply(&self, tree: &mut dyn SourceTree) -> Result<(), PatchError> {
        let contents = tree.read_to_string(self.target())?;
        tree.write(self.target(), &Self::transform(&contents))
    }
}
