/// Core domain types for actpin references, commit hashes, and run tallies.
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Matches a full-length legacy Git object id in either case.
static COMMIT_SHA_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| return Regex::new(r"^[0-9a-fA-F]{40}$").ok());

/// A remote action reference parsed from a `uses` string:
/// `owner/repo[/path]@version`. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ActionReference {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Sub-path inside the repository, empty for root-level actions.
    pub path: String,
    /// Repository name.
    pub repo: String,
    /// Tag, branch, or commit hash after the `@`.
    pub version: String,
}

impl ActionReference {
    /// True when `version` is already a 40-character hex commit hash.
    pub fn is_pinned(&self) -> bool {
        return is_commit_sha(&self.version);
    }

    /// The same reference with its version replaced by `sha`.
    pub fn pinned_to(&self, sha: &CommitSha) -> Self {
        return Self {
            owner: self.owner.clone(),
            path: self.path.clone(),
            repo: self.repo.clone(),
            version: sha.as_str().to_string(),
        };
    }

    /// Key identifying what a resolver lookup depends on. The sub-path does
    /// not affect the commit a version points to.
    pub fn resolution_key(&self) -> String {
        return format!("{}/{}@{}", self.owner, self.repo, self.version);
    }
}

impl fmt::Display for ActionReference {
    /// Render the exact `uses` text this reference was parsed from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}/{}@{}", self.owner, self.repo, self.version);
        }
        return write!(f, "{}/{}/{}@{}", self.owner, self.repo, self.path, self.version);
    }
}

/// A commit hash, 40 hex chars, always lowercase.
/// Newtype prevents mixing with arbitrary version labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(
    /// The lowercase hex-encoded object id.
    String,
);

impl CommitSha {
    /// The lowercase hex digits.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// Validate and normalize a hash string returned by a resolver.
    /// Returns `None` if it is not a 40-character hex string.
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_commit_sha(raw) {
            return None;
        }
        return Some(Self(raw.to_ascii_lowercase()));
    }
}

impl fmt::Display for CommitSha {
    /// Write the hash as-is.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// What happened to one workflow file during an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// No reference needed substitution; storage was not touched.
    Unchanged,
    /// The rewritten text was committed with this many substitutions.
    Written {
        /// Substitutions applied to the file.
        pinned: usize,
    },
}

/// Count of reference occurrences rewritten during one run, plus the
/// per-file outcomes in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTally {
    /// Files processed so far, with their terminal state.
    pub files: Vec<(PathBuf, FileOutcome)>,
    /// Total substitutions across all files.
    pub pinned: usize,
}

impl UpdateTally {
    /// Record the terminal state of a processed file.
    pub fn record(&mut self, file: PathBuf, outcome: FileOutcome) {
        if let FileOutcome::Written { pinned } = outcome {
            self.pinned = self.pinned.saturating_add(pinned);
        }
        self.files.push((file, outcome));
    }

    /// Number of files whose text was written back.
    pub fn written_files(&self) -> usize {
        return self
            .files
            .iter()
            .filter(|(_, outcome)| return matches!(outcome, FileOutcome::Written { .. }))
            .count();
    }
}

/// True if `value` is a full 40-character hex string (either case).
pub fn is_commit_sha(value: &str) -> bool {
    return COMMIT_SHA_PATTERN
        .as_ref()
        .is_some_and(|pattern| return pattern.is_match(value));
}
