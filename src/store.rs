//! Read and write access to workflow files by project-relative path.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Storage the update engine reads workflows from and commits rewrites to.
pub trait WorkflowStore {
    /// Full text of the workflow at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailed` if the file cannot be read as UTF-8 text.
    fn read(&self, path: &Path) -> Result<String, Error>;

    /// Replace the workflow at `path` with `content` as a single commit.
    ///
    /// # Errors
    ///
    /// Returns `Error::WriteFailed` if the content cannot be persisted.
    fn write(&self, path: &Path, content: &str) -> Result<(), Error>;
}

/// Workflows on the local filesystem under a project root.
pub struct FsStore {
    /// Project root that relative paths are joined onto.
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`.
    pub fn new(root: &Path) -> Self {
        return Self { root: root.to_path_buf() };
    }
}

impl WorkflowStore for FsStore {
    fn read(&self, path: &Path) -> Result<String, Error> {
        let full = self.root.join(path);
        return std::fs::read_to_string(&full)
            .map_err(|source| return Error::ReadFailed { path: path.to_path_buf(), source });
    }

    /// Write to a temporary sibling and rename it over the original so the
    /// file is never observed half-written. Existing permissions are kept.
    /// A symlinked workflow keeps its link; the file it points at is replaced.
    fn write(&self, path: &Path, content: &str) -> Result<(), Error> {
        let full = self.root.join(path);
        let target = std::fs::canonicalize(&full).unwrap_or(full);
        let write_error = |source| return Error::WriteFailed { path: path.to_path_buf(), source };

        let dir = target.parent().unwrap_or_else(|| return Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(content.as_bytes()).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        if let Ok(metadata) = std::fs::metadata(&target) {
            temp.as_file().set_permissions(metadata.permissions()).map_err(write_error)?;
        }
        temp.persist(&target).map_err(|e| return write_error(e.error))?;
        return Ok(());
    }
}
