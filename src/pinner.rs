//! Update engine: rewrites workflow `uses` references to pinned commit hashes.
//!
//! Each file moves through read, parse, resolve, and substitute, and is
//! written back only if at least one substitution changed its text.
//! References are resolved in document order and substitutions are applied
//! as a fold over the evolving text, each consuming the first remaining
//! verbatim occurrence of its `owner/repo[/path]@version` string.

use std::collections::HashMap;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::finder::WorkflowFinder;
use crate::resolver::Resolver;
use crate::scanner;
use crate::store::WorkflowStore;
use crate::types::{ActionReference, CommitSha, FileOutcome, UpdateTally};

/// A reference paired with the commit it should be pinned to.
#[derive(Debug, Clone)]
pub struct Pin {
    /// The reference as parsed from the workflow.
    pub reference: ActionReference,
    /// Commit the version label resolved to.
    pub sha: CommitSha,
}

/// Drives one update run over every discovered workflow file.
pub struct Pinner<'a, F, S, R> {
    /// Run-wide cancellation; once fired no further lookups are issued.
    cancel: CancellationToken,
    /// Source of workflow paths.
    finder: &'a F,
    /// Lookups already answered during this run, keyed by `owner/repo@version`.
    resolved: HashMap<String, CommitSha>,
    /// Maps version labels to commits.
    resolver: &'a R,
    /// Workflow text storage.
    store: &'a S,
    /// Progress of the current run.
    tally: UpdateTally,
}

impl<'a, F, S, R> Pinner<'a, F, S, R>
where
    F: WorkflowFinder,
    S: WorkflowStore,
    R: Resolver,
{
    /// Engine over the given capabilities, governed by `cancel`.
    pub fn new(finder: &'a F, store: &'a S, resolver: &'a R, cancel: CancellationToken) -> Self {
        return Self {
            cancel,
            finder,
            resolved: HashMap::new(),
            resolver,
            store,
            tally: UpdateTally::default(),
        };
    }

    /// Read, resolve, rewrite, and conditionally write back one file.
    ///
    /// # Errors
    ///
    /// Returns read, parse, resolution, cancellation, or write errors.
    async fn process_file(&mut self, file: &Path) -> Result<FileOutcome, Error> {
        tracing::debug!(file = %file.display(), "processing workflow");
        let text = self.store.read(file)?;
        let references = scanner::parse_workflow(file, &text)?;
        tracing::debug!(file = %file.display(), count = references.len(), "found action references");

        let pins = self.resolve_pins(&references).await?;
        let (updated, pinned) = apply_pins(&text, &pins);
        if pinned == 0 {
            tracing::info!(file = %file.display(), "no changes");
            return Ok(FileOutcome::Unchanged);
        }

        self.store.write(file, &updated)?;
        tracing::info!(file = %file.display(), pinned, "pinned action references");
        return Ok(FileOutcome::Written { pinned });
    }

    /// Resolve one reference, reusing an earlier answer from this run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if the token has fired, even when the
    /// answer is already known, or fires during the lookup. Otherwise the
    /// resolver's error.
    async fn resolve_once(&mut self, reference: &ActionReference) -> Result<CommitSha, Error> {
        let cancelled = || return Error::Cancelled { reference: Some(reference.to_string()) };
        if self.cancel.is_cancelled() {
            return Err(cancelled());
        }

        let key = reference.resolution_key();
        if let Some(sha) = self.resolved.get(&key) {
            tracing::debug!(reference = %reference, sha = %sha, "already resolved this run");
            return Ok(sha.clone());
        }

        tracing::debug!(reference = %reference, "resolving");
        let sha = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(cancelled()),
            result = self.resolver.resolve(reference) => result?,
        };
        tracing::debug!(reference = %reference, sha = %sha, "resolved");

        self.resolved.insert(key, sha.clone());
        return Ok(sha);
    }

    /// Resolve every unpinned reference in document order.
    ///
    /// # Errors
    ///
    /// Stops at the first failed resolution; a partially pinned file is never produced.
    async fn resolve_pins(&mut self, references: &[ActionReference]) -> Result<Vec<Pin>, Error> {
        let mut pins = Vec::with_capacity(references.len());
        for reference in references {
            if reference.is_pinned() {
                tracing::debug!(reference = %reference, "already pinned");
                continue;
            }
            let sha = self.resolve_once(reference).await?;
            pins.push(Pin { reference: reference.clone(), sha });
        }
        return Ok(pins);
    }

    /// Process every discovered workflow file in order.
    ///
    /// Files written before a failure stay written; the tally accumulated
    /// up to that point remains available through [`Pinner::tally`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` if workflows cannot be listed, otherwise the
    /// first failure from any file, annotated with that file's path. Once the
    /// token has fired no further file is read, and the run fails with
    /// `Error::Cancelled`.
    pub async fn run(&mut self) -> Result<UpdateTally, Error> {
        self.tally = UpdateTally::default();
        self.resolved.clear();

        let files = self.finder.find_workflows()?;
        tracing::debug!(count = files.len(), "found workflow files");

        for file in files {
            if self.cancel.is_cancelled() {
                return Err(attach_file(&file, Error::Cancelled { reference: None }));
            }
            match self.process_file(&file).await {
                Ok(outcome) => self.tally.record(file, outcome),
                Err(e) => return Err(attach_file(&file, e)),
            }
        }

        return Ok(self.tally.clone());
    }

    /// Progress of the current or most recent run.
    pub const fn tally(&self) -> &UpdateTally {
        return &self.tally;
    }
}

/// Apply pins to `text` in order, each against the output of the previous one.
/// Returns the final text and the number of substitutions that changed it.
pub fn apply_pins(text: &str, pins: &[Pin]) -> (String, usize) {
    return pins.iter().fold((text.to_string(), 0_usize), |(current, count), pin| {
        return match substitute(&current, pin) {
            None => (current, count),
            Some(next) => (next, count.saturating_add(1)),
        };
    });
}

/// Wrap an error with the workflow path unless it already names the file.
fn attach_file(file: &Path, e: Error) -> Error {
    return match e {
        Error::InvalidReference { .. }
        | Error::ReadFailed { .. }
        | Error::WorkflowYaml { .. }
        | Error::WriteFailed { .. } => e,
        other => Error::Workflow { file: file.to_path_buf(), source: Box::new(other) },
    };
}

/// Replace the first verbatim occurrence of the pin's reference text with
/// the pinned form. `None` if the text does not contain it or is unchanged.
pub fn substitute(text: &str, pin: &Pin) -> Option<String> {
    let old = pin.reference.to_string();
    if !text.contains(&old) {
        tracing::warn!(reference = %old, "reference not found verbatim, skipping");
        return None;
    }

    let new = pin.reference.pinned_to(&pin.sha).to_string();
    let updated = text.replacen(&old, &new, 1);
    if updated == text {
        return None;
    }
    return Some(updated);
}
