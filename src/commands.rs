//! CLI commands for actpin: version, scan, update.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Error;
use crate::finder::{DirectoryFinder, WorkflowFinder as _};
use crate::pinner::Pinner;
use crate::resolver::GitHubResolver;
use crate::scanner;
use crate::store::{FsStore, WorkflowStore as _};
use crate::types::ActionReference;

/// References found in one workflow file, as reported by `scan`.
#[derive(serde::Serialize)]
struct ScanEntry {
    /// Workflow path relative to the scanned directory.
    file: PathBuf,
    /// Remote references in document order.
    references: Vec<ActionReference>,
}

/// Options for [`update`] beyond the directory.
pub struct UpdateOptions {
    /// API base URL override.
    pub api_url: Option<String>,
    /// Run budget override in seconds.
    pub timeout: Option<u64>,
    /// List every processed file.
    pub verbose: bool,
}

/// Round to whole milliseconds for display.
fn format_elapsed(elapsed: Duration) -> String {
    let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    return humantime::format_duration(Duration::from_millis(millis)).to_string();
}

/// Discover workflows, parse their references, and print what was found.
/// Performs no resolution and writes nothing.
///
/// # Errors
///
/// Returns errors from config loading, discovery, reading, parsing, or JSON output.
pub fn scan(dir: &Path, verbose: bool, json: bool) -> Result<(), Error> {
    let config = Config::load(dir)?;
    let finder = DirectoryFinder::new(dir, &config);
    let store = FsStore::new(dir);

    tracing::info!(dir = %dir.display(), "scanning");
    let files = finder.find_workflows()?;
    tracing::info!(count = files.len(), "found workflow files");

    let mut report = Vec::with_capacity(files.len());
    for file in files {
        let text = store.read(&file)?;
        let references = scanner::parse_workflow(&file, &text)?;
        report.push(ScanEntry { file, references });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in &report {
        if verbose {
            for reference in &entry.references {
                println!("- Action: {}/{}@{}", reference.owner, reference.repo, reference.version);
            }
        } else if !entry.references.is_empty() {
            println!("{}: {} actions found", entry.file.display(), entry.references.len());
        }
    }

    return Ok(());
}

/// Pin every remote reference under `dir` to its commit hash, bounded by
/// the configured time budget.
///
/// # Errors
///
/// Returns `Error::Timeout` if the budget runs out, otherwise any error from
/// config loading, discovery, resolution, or write-back.
pub async fn update(dir: &Path, options: &UpdateOptions) -> Result<(), Error> {
    let start = Instant::now();
    let root = std::path::absolute(dir)?;
    let config = Config::load(&root)?;
    let seconds = config.timeout_secs(options.timeout);
    let api_url = config.api_url(options.api_url.as_deref());

    tracing::info!(dir = %root.display(), %api_url, timeout = seconds, "updating workflows");
    let resolver = GitHubResolver::from_env(&api_url)?;
    let finder = DirectoryFinder::new(&root, &config);
    let store = FsStore::new(&root);

    let cancel = CancellationToken::new();
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            cancel.cancel();
        }
    });

    let mut pinner = Pinner::new(&finder, &store, &resolver, cancel.clone());
    let result = pinner.run().await;
    timer.abort();

    let tally = match result {
        Err(e) => {
            let partial = pinner.tally();
            if partial.pinned > 0 {
                eprintln!(
                    "note: {} action references in {} files were pinned before the failure",
                    partial.pinned,
                    partial.written_files(),
                );
            }
            if cancel.is_cancelled() && matches!(e.root_cause(), Error::Cancelled { .. }) {
                return Err(Error::Timeout { seconds });
            }
            return Err(e);
        },
        Ok(tally) => tally,
    };

    tracing::info!(files = tally.written_files(), "rewrote workflow files");
    if options.verbose {
        for (file, _) in &tally.files {
            println!("- Processed: {}", file.display());
        }
    }
    println!("Updated {} action references in {}", tally.pinned, format_elapsed(start.elapsed()));

    return Ok(());
}

/// Print version and build metadata.
pub fn version() {
    println!(
        "Version: {}\nCommit: {}\nDate: {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("ACTPIN_COMMIT").unwrap_or("unknown"),
        option_env!("ACTPIN_BUILD_DATE").unwrap_or("unknown"),
    );
    return;
}

#[cfg(test)]
mod tests {
    use super::format_elapsed;
    use std::time::Duration;

    #[test]
    fn elapsed_rounds_to_milliseconds() {
        assert_eq!(format_elapsed(Duration::from_micros(1_234_567)), "1s 234ms");
        assert_eq!(format_elapsed(Duration::from_micros(900)), "0s");
    }
}
