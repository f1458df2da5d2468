/// Crate-level error types for actpin diagnostics.
use std::path::PathBuf;

/// All errors in actpin carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, reference, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with an unexpected status or payload.
    #[error("github api: {message} ({url})")]
    Api {
        /// Description of what was wrong with the response.
        message: String,
        /// HTTP status code, if a response was received.
        status: Option<u16>,
        /// Request URL.
        url: String,
    },

    /// The run-wide cancellation token fired before the run finished.
    #[error(
        "cancelled{}",
        .reference.as_ref().map(|r| return format!(" while resolving `{r}`")).unwrap_or_default()
    )]
    Cancelled {
        /// Reference whose resolution was interrupted, if one was in progress.
        reference: Option<String>,
    },

    /// `.actpin.toml` was parsed but holds an unusable value.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// Description of the invalid setting.
        reason: String,
    },

    /// Walking the workflow directory failed.
    #[error("failed to find workflow files under {}: {source}", path.display())]
    Discovery {
        /// Directory being walked.
        path: PathBuf,
        /// The underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// Transport-level failure talking to the API.
    #[error("http request to {url} failed: {source}")]
    Http {
        /// Request URL.
        url: String,
        /// The wrapped client error.
        #[source]
        source: reqwest::Error,
    },

    /// A `uses` string in a workflow could not be understood.
    #[error("invalid action reference {uses:?} in {}: {source}", file.display())]
    InvalidReference {
        /// Workflow file containing the reference.
        file: PathBuf,
        /// Parse failure detail.
        #[source]
        source: ReferenceError,
        /// Raw `uses` text as written in the workflow.
        uses: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The API refused the request because the rate limit is exhausted.
    #[error("github api rate limit exceeded ({url})")]
    RateLimited {
        /// Request URL.
        url: String,
    },

    /// A workflow file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The run budget ran out.
    #[error("timed out after {seconds}s")]
    Timeout {
        /// Configured budget in seconds.
        seconds: u64,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Neither a tag nor a branch with the reference's version exists.
    #[error("failed to resolve `{reference}` as a tag or branch: {source}")]
    UnresolvableReference {
        /// Reference that could not be resolved.
        reference: String,
        /// Failure from the last lookup attempted.
        #[source]
        source: Box<Error>,
    },

    /// Processing a workflow file failed; wraps the cause with the file path.
    #[error("{}: {source}", file.display())]
    Workflow {
        /// Workflow file being processed.
        file: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Workflow text is not valid YAML or has an unexpected shape.
    #[error("failed to parse workflow {}: {source}", file.display())]
    WorkflowYaml {
        /// File that failed to decode.
        file: PathBuf,
        /// The wrapped YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Storage rejected the rewritten workflow.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        /// File that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Follow `Workflow` and `UnresolvableReference` wrappers to the innermost error.
    pub fn root_cause(&self) -> &Self {
        return match self {
            Self::UnresolvableReference { source, .. } | Self::Workflow { source, .. } => {
                source.root_cause()
            },
            other => other,
        };
    }
}

/// Reasons a `uses` string is not a well-formed `owner/repo[/path]@version`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// Owner, repository, or version is empty.
    #[error("empty component in action reference")]
    EmptyComponent,

    /// Fewer than two `/`-separated components before the `@`.
    #[error("invalid repository format, expected at least owner/repo")]
    InvalidRepositoryFormat,

    /// Not exactly one `@`, or stray whitespace.
    #[error("malformed action reference: {reason}")]
    MalformedReference {
        /// What was wrong with the string.
        reason: &'static str,
    },
}
