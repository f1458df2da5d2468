use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Short heading naming the kind of failure, taken from the root cause.
fn heading(root: &Error) -> &'static str {
    match root {
        Error::Api { .. } => "GitHub API",
        Error::Cancelled { .. } => "Cancelled",
        Error::ConfigInvalid { .. } | Error::TomlDe(_) => "Invalid Config",
        Error::Discovery { .. } => "Workflow Discovery Failed",
        Error::Http { .. } => "Network",
        Error::InvalidReference { .. } => "Invalid Action Reference",
        Error::Io(_) => "I/O",
        Error::Json(_) => "JSON Output",
        Error::RateLimited { .. } => "GitHub API Rate Limit",
        Error::ReadFailed { .. } => "Read Failed",
        Error::Timeout { .. } => "Timeout",
        Error::UnresolvableReference { .. } | Error::Workflow { .. } => "Update Failed",
        Error::WorkflowYaml { .. } => "Invalid Workflow",
        Error::WriteFailed { .. } => "Write Failed",
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened,
/// then how to fix it when there is something the user can do.
pub fn render_error(e: &Error) -> String {
    let root = e.root_cause();
    let mut out = format!("# Error: {}\n\n{e}\n", heading(root));
    if let Some(fix) = render_fix(e, root) {
        out.push_str("\n## Fix\n\n");
        out.push_str(&fix);
    }
    out
}

/// Suggested remedy for the failure, if any.
fn render_fix(e: &Error, root: &Error) -> Option<String> {
    match root {
        Error::RateLimited { .. } => Some("\
Anonymous API access is limited to 60 requests per hour. Authenticate:

    export GITHUB_TOKEN=<token>
".to_string()),

        Error::Api { status: Some(401), .. } => Some("\
The API rejected the credentials. Check that `GITHUB_TOKEN` is valid.
".to_string()),

        Error::Api { status: Some(404), .. } if is_unresolvable(e) => Some("\
Check that the tag or branch exists in the referenced repository.
Private repositories also require `GITHUB_TOKEN`.
".to_string()),

        Error::Http { .. } => Some("\
Check network access, or point `GITHUB_API_URL` / `--api-url` at your API server.
".to_string()),

        Error::Timeout { seconds } => Some(format!("\
Allow more time; files already written stay pinned, so re-running resumes:

    actpin update --timeout {}
", seconds.saturating_mul(2))),

        Error::InvalidReference { .. } => Some("\
Remote references must have the form `owner/repo[/path]@version`.
Local actions start with `./` or `../`; images use `docker://`.
".to_string()),

        Error::ConfigInvalid { .. } | Error::TomlDe(_) => Some(format!("\
Fix or remove `{CONFIG_FILE}`.
")),

        _ => None,
    }
}

/// True if any layer of `e` is a failed tag/branch lookup.
fn is_unresolvable(e: &Error) -> bool {
    match e {
        Error::UnresolvableReference { .. } => true,
        Error::Workflow { source, .. } => is_unresolvable(source),
        _ => false,
    }
}
