//! Contract of the version-control client used to look up base content.

use crate::errors::RepositoryError;

/// Tag marking the last commit whose docs were synchronized with the server.
pub const DOCUMENTATION_TAG: &str = "upload-charm-docs/base-content";

pub trait RepositoryApi {
    /// Content of `path` (relative to the repository root) at `tag`.
    ///
    /// Fails with [`RepositoryError::FileNotFound`] when the file was not
    /// tracked at the tag and [`RepositoryError::TagNotFound`] when the tag
    /// is missing.
    fn get_file_content_from_tag(&self, path: &str, tag: &str) -> Result<String, RepositoryError>;
}
