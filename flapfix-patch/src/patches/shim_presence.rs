use camino::{Utf8Path, Utf8PathBuf};

use super::SourcePatch;
use crate::error::PatchError;
use crate::tree::SourceTree;

const TARGET: &str = "nextflap.py";

/// `compile.py` expects the Python-side shim module next to the C++
/// sources. Some source layouts ship without it; when the tree lacks the
/// file it is copied in from a known sibling location.
pub struct ShimPresencePatch {
    sibling: Utf8PathBuf,
}

impl ShimPresencePatch {
    pub fn new(sibling: Utf8PathBuf) -> Self {
        Self { sibling }
    }
}

impl SourcePatch for ShimPresencePatch {
    fn id(&self) -> &'static str {
        "nextflap.shim_presence"
    }

    fn title(&self) -> &'static str {
        "Ensure nextflap.py is present in the source tree"
    }

    fn target(&self) -> &Utf8Path {
        Utf8Path::new(TARGET)
    }

    fn is_applied(&self, tree: &dyn SourceTree) -> Result<bool, PatchError> {
        Ok(tree.exists(self.target()))
    }

    fn apply(&self, tree: &mut dyn SourceTree) -> Result<(), PatchError> {
        if !self.sibling.exists() {
            return Err(PatchError::ShimUnavailable {
                patch: "nextflap.shim_presence",
                file: self.target().to_path_buf(),
                sibling: self.sibling.clone(),
            });
        }
        tree.copy_in(&self.sibling, self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::FsTree;
    use fs_err as fs;
    use tempfile::TempDir;

    fn utf8(p: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(p.to_path_buf()).expect("utf8")
    }

    #[test]
    fn copies_from_sibling_when_missing() {
        let temp = TempDir::new().unwrap();
        let root = utf8(temp.path());
        fs::create_dir_all(root.join("tree")).unwrap();
        fs::write(root.join("nextflap.py"), "class NextFLAPImpl: pass\n").unwrap();

        let mut tree = FsTree::new(root.join("tree"));
        let patch = ShimPresencePatch::new(root.join("nextflap.py"));

        assert!(!patch.is_applied(&tree).unwrap());
        patch.apply(&mut tree).unwrap();
        assert!(patch.is_applied(&tree).unwrap());
        assert_eq!(
            tree.read_to_string(Utf8Path::new("nextflap.py")).unwrap(),
            "class NextFLAPImpl: pass\n"
        );
    }

    #[test]
    fn present_file_means_already_applied() {
        let temp = TempDir::new().unwrap();
        let root = utf8(temp.path());
        fs::write(root.join("nextflap.py"), "local copy\n").unwrap();

        let tree = FsTree::new(root.clone());
        let patch = ShimPresencePatch::new(root.join("does-not-matter.py"));
        assert!(patch.is_applied(&tree).unwrap());
    }

    #[test]
    fn missing_everywhere_is_fatal() {
        let temp = TempDir::new().unwrap();
        let root = utf8(temp.path());

        let mut tree = FsTree::new(root.clone());
        let patch = ShimPresencePatch::new(root.join("nowhere/nextflap.py"));
        let err = patch.apply(&mut tree).unwrap_err();
        assert!(matches!(err, PatchError::ShimUnavailable { .. }));
    }
}
