use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, ReferenceError};
use crate::types::ActionReference;

/// Prefixes of `uses` values that never point at a remote repository:
/// actions inside the same checkout and container images.
const NON_REMOTE_PREFIXES: [&str; 3] = ["./", "../", "docker://"];

/// A job entry. Only the `uses` fields matter; everything else is ignored.
#[derive(serde::Deserialize)]
struct Job {
    /// Steps in document order.
    #[serde(default)]
    steps: Option<Vec<Step>>,
    /// Reusable workflow called by the whole job.
    #[serde(default)]
    uses: Option<String>,
}

/// A single step entry.
#[derive(serde::Deserialize)]
struct Step {
    /// Action invoked by the step.
    #[serde(default)]
    uses: Option<String>,
}

/// The fragment of a workflow file actpin reads. Jobs keep document order.
#[derive(serde::Deserialize)]
struct WorkflowFile {
    /// Jobs keyed by job id.
    #[serde(default)]
    jobs: Option<IndexMap<String, Option<Job>>>,
}

/// Collect every non-empty `uses` value in document order: for each job,
/// its own `uses` first, then its steps.
///
/// # Errors
///
/// Returns `Error::WorkflowYaml` if the content is not YAML or the `jobs`
/// section has an unexpected shape.
pub fn extract_uses(file: &Path, content: &str) -> Result<Vec<String>, Error> {
    let yaml_error = |source| return Error::WorkflowYaml { file: file.to_path_buf(), source };

    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(yaml_error)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    let workflow: WorkflowFile = serde_yaml::from_value(value).map_err(yaml_error)?;

    let mut uses = Vec::new();
    for job in workflow.jobs.unwrap_or_default().into_values().flatten() {
        uses.extend(job.uses);
        for step in job.steps.unwrap_or_default() {
            uses.extend(step.uses);
        }
    }
    uses.retain(|value| return !value.is_empty());
    return Ok(uses);
}

/// True for references that name a remote repository. Local paths and
/// container images are skipped before parsing, never reported as errors.
pub fn is_remote_reference(uses: &str) -> bool {
    return !NON_REMOTE_PREFIXES
        .iter()
        .any(|prefix| return uses.starts_with(prefix));
}

/// Parse `owner/repo[/path]@version` into an [`ActionReference`].
///
/// Splitting is exact: no trimming or case folding. Whitespace anywhere in
/// the string is rejected because the rewritten text could never match it.
///
/// # Errors
///
/// Returns `ReferenceError::MalformedReference` unless there is exactly one
/// `@` and no whitespace, `ReferenceError::InvalidRepositoryFormat` if fewer
/// than two path components precede the `@`, and
/// `ReferenceError::EmptyComponent` if owner, repo, or version is empty.
pub fn parse_reference(uses: &str) -> Result<ActionReference, ReferenceError> {
    if uses.chars().any(char::is_whitespace) {
        return Err(ReferenceError::MalformedReference { reason: "contains whitespace" });
    }

    let mut at_parts = uses.split('@');
    let (Some(full_path), Some(version), None) = (at_parts.next(), at_parts.next(), at_parts.next())
    else {
        return Err(ReferenceError::MalformedReference { reason: "expected exactly one @" });
    };

    let mut components = full_path.split('/');
    let (Some(owner), Some(repo)) = (components.next(), components.next()) else {
        return Err(ReferenceError::InvalidRepositoryFormat);
    };
    let path = components.collect::<Vec<_>>().join("/");

    if owner.is_empty() || repo.is_empty() || version.is_empty() {
        return Err(ReferenceError::EmptyComponent);
    }

    return Ok(ActionReference {
        owner: owner.to_string(),
        path,
        repo: repo.to_string(),
        version: version.to_string(),
    });
}

/// Extract and parse all remote action references in a workflow, in file order.
///
/// # Errors
///
/// Returns `Error::WorkflowYaml` for undecodable content and
/// `Error::InvalidReference` for the first malformed remote reference.
pub fn parse_workflow(file: &Path, content: &str) -> Result<Vec<ActionReference>, Error> {
    let mut references = Vec::new();
    for uses in extract_uses(file, content)? {
        if !is_remote_reference(&uses) {
            tracing::debug!(%uses, "skipping local or container reference");
            continue;
        }
        let reference = parse_reference(&uses).map_err(|source| {
            return Error::InvalidReference { file: file.to_path_buf(), source, uses: uses.clone() };
        })?;
        references.push(reference);
    }
    return Ok(references);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Vec<ActionReference>, Error> {
        return parse_workflow(Path::new(".github/workflows/ci.yml"), content);
    }

    fn triple(reference: &ActionReference) -> (&str, &str, &str) {
        return (&reference.owner, &reference.repo, &reference.version);
    }

    #[test]
    fn parses_simple_references_in_order() {
        let content = "
name: CI
on: push
jobs:
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - uses: actions/setup-go@v4
      - uses: actions/setup-java@v4.7
      - uses: actions/setup-node@v4.3.0
";
        let refs = parse(content).unwrap();
        let triples: Vec<_> = refs.iter().map(triple).collect();
        assert_eq!(
            triples,
            vec![
                ("actions", "checkout", "v3"),
                ("actions", "setup-go", "v4"),
                ("actions", "setup-java", "v4.7"),
                ("actions", "setup-node", "v4.3.0"),
            ]
        );
        assert!(refs.iter().all(|r| r.path.is_empty()));
    }

    #[test]
    fn ignores_comments_and_unrelated_fields() {
        let content = "
---
name: Lint

on:  # yamllint disable-line rule:truthy
  pull_request: null

permissions: {}

jobs:
  build:
    name: Lint
    runs-on: ubuntu-latest
    steps:
      - name: Checkout code
        uses: actions/checkout@v4
        with:
          fetch-depth: 0

      - name: Super-linter
        uses: super-linter/super-linter@v6.7.0  # x-release-please-version
        env:
          GITHUB_TOKEN: ${{ secrets.GITHUB_TOKEN }}
      - name: No action
        run: echo hi
";
        let refs = parse(content).unwrap();
        let triples: Vec<_> = refs.iter().map(triple).collect();
        assert_eq!(
            triples,
            vec![("actions", "checkout", "v4"), ("super-linter", "super-linter", "v6.7.0")]
        );
    }

    #[test]
    fn keeps_job_order_from_document() {
        let content = "
jobs:
  zeta:
    steps:
      - uses: z/z@v1
  alpha:
    steps:
      - uses: a/a@v1
  middle:
    steps:
      - uses: m/m@v1
";
        let owners: Vec<_> = parse(content).unwrap().into_iter().map(|r| r.owner).collect();
        assert_eq!(owners, vec!["z", "a", "m"]);
    }

    #[test]
    fn includes_job_level_reusable_workflows() {
        let content = "
jobs:
  call:
    uses: octo-org/shared/.github/workflows/build.yml@v2
  test:
    steps:
      - uses: actions/checkout@v4
";
        let refs = parse(content).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, ".github/workflows/build.yml");
        assert_eq!(refs[0].version, "v2");
        assert_eq!(refs[1].repo, "checkout");
    }

    #[test]
    fn skips_local_and_container_references() {
        let content = "---
on: push
jobs:
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Check if version was updated
        uses: ./.github/actions/setup-versions
        with:
          branch_to_compare: ${{ github.base_ref }}
      - uses: ../parent/local/action
      - uses: docker://alpine:3.14
      - uses: actions/setup-java@v4.0.1
";
        let refs = parse(content).unwrap();
        let triples: Vec<_> = refs.iter().map(triple).collect();
        assert_eq!(
            triples,
            vec![("actions", "checkout", "v4"), ("actions", "setup-java", "v4.0.1")]
        );
    }

    #[test]
    fn parses_path_based_reference() {
        let reference =
            parse_reference("myorg/actions-maven-setup/.github/actions/maven-setup@v1.0.1").unwrap();
        assert_eq!(
            reference,
            ActionReference {
                owner: "myorg".to_string(),
                path: ".github/actions/maven-setup".to_string(),
                repo: "actions-maven-setup".to_string(),
                version: "v1.0.1".to_string(),
            }
        );
    }

    #[test]
    fn rejects_missing_at() {
        assert!(matches!(
            parse_reference("invalid-ref"),
            Err(ReferenceError::MalformedReference { .. })
        ));
    }

    #[test]
    fn rejects_multiple_at() {
        assert!(matches!(
            parse_reference("actions/checkout@v1@v2"),
            Err(ReferenceError::MalformedReference { .. })
        ));
    }

    #[test]
    fn rejects_empty_version() {
        assert_eq!(parse_reference("actions/checkout@"), Err(ReferenceError::EmptyComponent));
    }

    #[test]
    fn rejects_empty_owner_or_repo() {
        assert_eq!(parse_reference("/checkout@v1"), Err(ReferenceError::EmptyComponent));
        assert_eq!(parse_reference("actions/@v1"), Err(ReferenceError::EmptyComponent));
    }

    #[test]
    fn rejects_single_component() {
        assert_eq!(parse_reference("checkout@v1"), Err(ReferenceError::InvalidRepositoryFormat));
    }

    #[test]
    fn rejects_whitespace_around_at() {
        assert!(matches!(
            parse_reference("actions/checkout  @v3"),
            Err(ReferenceError::MalformedReference { .. })
        ));
        assert!(matches!(
            parse_reference("actions/checkout@ v3"),
            Err(ReferenceError::MalformedReference { .. })
        ));
    }

    #[test]
    fn malformed_reference_fails_the_whole_file() {
        let content = "
jobs:
  test:
    steps:
      - uses: actions/checkout@v4
      - uses: invalid-ref
";
        let err = parse(content).unwrap_err();
        let Error::InvalidReference { uses, source, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(uses, "invalid-ref");
        assert!(matches!(source, ReferenceError::MalformedReference { .. }));
    }

    #[test]
    fn empty_and_jobless_documents_have_no_references() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only a comment\n").unwrap().is_empty());
        assert!(parse("steps:\n  - uses: invalid-ref\n").unwrap().is_empty());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(parse("jobs: [unterminated"), Err(Error::WorkflowYaml { .. })));
    }
}
