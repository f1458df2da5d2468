//! Workflow file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;

/// Directory, relative to the project root, that holds workflow files.
pub const WORKFLOW_DIR: &str = ".github/workflows";

/// Produces the ordered list of workflow files to process.
pub trait WorkflowFinder {
    /// Paths relative to the project root, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` if the tree cannot be traversed.
    fn find_workflows(&self) -> Result<Vec<PathBuf>, Error>;
}

/// Finds `.yml`/`.yaml` files that are direct children of `.github/workflows`.
pub struct DirectoryFinder<'a> {
    /// Include/exclude filters from the project config.
    config: &'a Config,
    /// Project root.
    root: PathBuf,
}

impl<'a> DirectoryFinder<'a> {
    /// Finder rooted at `root`, filtered by `config`.
    pub fn new(root: &Path, config: &'a Config) -> Self {
        return Self { config, root: root.to_path_buf() };
    }
}

impl WorkflowFinder for DirectoryFinder<'_> {
    /// Walk the workflow directory one level deep, sorted by file name.
    /// A project without a workflow directory has no workflows.
    fn find_workflows(&self) -> Result<Vec<PathBuf>, Error> {
        let workflow_dir = self.root.join(WORKFLOW_DIR);
        if !workflow_dir.is_dir() {
            tracing::debug!(dir = %workflow_dir.display(), "no workflow directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&workflow_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|source| {
                return Error::Discovery { path: workflow_dir.clone(), source };
            })?;
            if entry.file_type().is_dir() || !has_workflow_extension(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if !self.config.should_process(&relative.to_string_lossy()) {
                tracing::debug!(file = %relative.display(), "excluded by config");
                continue;
            }
            files.push(relative.to_path_buf());
        }

        return Ok(files);
    }
}

/// True for `.yml` and `.yaml`, compared case-insensitively.
fn has_workflow_extension(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|ext| return ext.to_str())
        .is_some_and(|ext| {
            return ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml");
        });
}
