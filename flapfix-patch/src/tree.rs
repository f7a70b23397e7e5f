use std::collections::BTreeMap;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

use crate::error::PatchError;

/// Read/write access to the planner source tree.
///
/// Patches only ever see this trait, so the engine can run against the
/// real filesystem, an in-memory overlay (dry-run previews), or a stub.
pub trait SourceTree {
    fn root(&self) -> &Utf8Path;

    fn read_to_string(&self, rel: &Utf8Path) -> Result<String, PatchError>;

    fn exists(&self, rel: &Utf8Path) -> bool;

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> Result<(), PatchError>;

    /// Copy an external file (absolute path) into the tree.
    fn copy_in(&mut self, from: &Utf8Path, rel: &Utf8Path) -> Result<(), PatchError>;
}

/// Filesystem-backed tree. Writes go through a temp file in the target
/// directory followed by a rename, so a patch application is atomic from
/// the caller's perspective.
#[derive(Debug, Clone)]
pub struct FsTree {
    root: Utf8PathBuf,
}

impl FsTree {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.root.join(rel)
    }
}

impl SourceTree for FsTree {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> Result<String, PatchError> {
        let abs = self.abs(rel);
        fs::read_to_string(&abs).map_err(|e| PatchError::io("read", &abs, e))
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.abs(rel).exists()
    }

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> Result<(), PatchError> {
        let abs = self.abs(rel);
        let parent = abs.parent().unwrap_or(&self.root);

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| PatchError::io("create temp file in", parent, e))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| PatchError::io("write", &abs, e))?;
        tmp.persist(&abs)
            .map_err(|e| PatchError::io("persist", &abs, e.error))?;
        Ok(())
    }

    fn copy_in(&mut self, from: &Utf8Path, rel: &Utf8Path) -> Result<(), PatchError> {
        let abs = self.abs(rel);
        fs::copy(from, &abs).map_err(|e| PatchError::io("copy", from, e))?;
        Ok(())
    }
}

/// In-memory overlay over another tree; used for dry-run previews.
///
/// Reads fall through to the base tree until a path has been written.
pub struct MemOverlay<'a> {
    base: &'a dyn SourceTree,
    changes: BTreeMap<Utf8PathBuf, String>,
}

impl<'a> MemOverlay<'a> {
    pub fn new(base: &'a dyn SourceTree) -> Self {
        Self {
            base,
            changes: BTreeMap::new(),
        }
    }

    /// Paths written during the overlay's lifetime, with their contents.
    pub fn changes(&self) -> &BTreeMap<Utf8PathBuf, String> {
        &self.changes
    }

    pub fn base(&self) -> &dyn SourceTree {
        self.base
    }
}

impl SourceTree for MemOverlay<'_> {
    fn root(&self) -> &Utf8Path {
        self.base.root()
    }

    fn read_to_string(&self, rel: &Utf8Path) -> Result<String, PatchError> {
        if let Some(contents) = self.changes.get(rel) {
            return Ok(contents.clone());
        }
        self.base.read_to_string(rel)
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.changes.contains_key(rel) || self.base.exists(rel)
    }

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> Result<(), PatchError> {
        self.changes.insert(rel.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn copy_in(&mut self, from: &Utf8Path, rel: &Utf8Path) -> Result<(), PatchError> {
        let contents =
            fs::read_to_string(from).map_err(|e| PatchError::io("read", from, e))?;
        self.changes.insert(rel.to_path_buf(), contents);
        Ok(())
    }
}
