use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors from the patch engine.
///
/// Anchor and shim failures are deliberately loud: proceeding with a
/// half-patched tree would only trade a clear diagnostic here for an
/// opaque compiler error later.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A rewrite could not find the text it keys on. The upstream file has
    /// likely been reformatted; the patch refuses to guess.
    #[error("patch '{patch}': anchor '{anchor}' not found in {file}")]
    AnchorMissing {
        patch: &'static str,
        anchor: &'static str,
        file: Utf8PathBuf,
    },

    /// The companion shim file is missing from the tree and from the
    /// sibling location it would be copied from.
    #[error("patch '{patch}': {file} is missing and no copy exists at {sibling}")]
    ShimUnavailable {
        patch: &'static str,
        file: Utf8PathBuf,
        sibling: Utf8PathBuf,
    },

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub(crate) fn io(context: &'static str, path: &camino::Utf8Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}
