//! Resolution of action version labels to commit hashes.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::types::{ActionReference, CommitSha};

/// Characters escaped in ref names. Slashes stay literal because branch and
/// tag names may contain them and the API expects them unescaped.
const REF_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Annotated tags may point at other tags; give up after this many hops.
const MAX_TAG_DEPTH: usize = 5;

/// Maps an action reference to the commit its version label points at.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `reference.version` for `reference.owner/reference.repo`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvableReference` when the version is neither a
    /// tag nor a branch, or a transport error from the implementation.
    async fn resolve(&self, reference: &ActionReference) -> Result<CommitSha, Error>;
}

/// Git object as returned inside ref and tag payloads.
#[derive(serde::Deserialize)]
struct GitObject {
    /// Object id.
    sha: String,
    /// `commit`, `tag`, `tree`, or `blob`.
    #[serde(rename = "type")]
    kind: String,
}

/// Payload of `GET /repos/{owner}/{repo}/git/ref/{ref}` and
/// `GET /repos/{owner}/{repo}/git/tags/{sha}`; both nest the target in `object`.
#[derive(serde::Deserialize)]
struct GitPointer {
    /// What the ref or tag points at.
    object: GitObject,
}

/// Resolver backed by the GitHub REST API: tag first, then branch.
pub struct GitHubResolver {
    /// API base URL without trailing slash.
    api_url: String,
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Bearer token; anonymous requests when absent.
    token: Option<String>,
}

impl GitHubResolver {
    /// Resolver authenticated with `GITHUB_TOKEN` when it is set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be constructed.
    pub fn from_env(api_url: &str) -> Result<Self, Error> {
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| return !t.is_empty());
        if token.is_none() {
            tracing::debug!("GITHUB_TOKEN not set, using anonymous API access");
        }
        return Self::new(api_url, token);
    }

    /// Fetch and decode one JSON document, classifying failures.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` on transport failure, `Error::RateLimited` when
    /// the quota is exhausted, or `Error::Api` for any other non-success status.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let http_error = |source| return Error::Http { url: url.to_string(), source };

        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        if is_rate_limited(status, response.headers()) {
            return Err(Error::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(Error::Api {
                message: format!("unexpected status {status}"),
                status: Some(status.as_u16()),
                url: url.to_string(),
            });
        }
        return response.json::<T>().await.map_err(http_error);
    }

    /// Look up `refs/{namespace}/{version}` and follow it to a commit.
    ///
    /// # Errors
    ///
    /// Returns any error from the API calls, or `Error::Api` if the ref
    /// ultimately names something other than a commit.
    async fn lookup_ref(&self, reference: &ActionReference, namespace: &str) -> Result<CommitSha, Error> {
        let url = format!(
            "{}/repos/{}/{}/git/ref/{namespace}/{}",
            self.api_url,
            reference.owner,
            reference.repo,
            utf8_percent_encode(&reference.version, REF_ENCODE_SET),
        );
        let pointer: GitPointer = self.get_json(&url).await?;
        return self.peel_to_commit(reference, pointer.object, &url).await;
    }

    /// Build a resolver against `api_url` with an optional bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be constructed.
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("actpin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| return Error::Http { url: api_url.to_string(), source })?;
        return Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            http,
            token,
        });
    }

    /// Follow annotated tag objects until a commit is reached.
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` for non-commit targets, malformed hashes, or tag
    /// chains deeper than [`MAX_TAG_DEPTH`].
    async fn peel_to_commit(
        &self,
        reference: &ActionReference,
        mut object: GitObject,
        url: &str,
    ) -> Result<CommitSha, Error> {
        for _ in 0..MAX_TAG_DEPTH {
            match object.kind.as_str() {
                "commit" => {
                    return CommitSha::parse(&object.sha).ok_or_else(|| {
                        return Error::Api {
                            message: format!("malformed commit hash {:?}", object.sha),
                            status: None,
                            url: url.to_string(),
                        };
                    });
                },
                "tag" => {
                    tracing::debug!(reference = %reference, tag = %object.sha, "dereferencing annotated tag");
                    let tag_url = format!(
                        "{}/repos/{}/{}/git/tags/{}",
                        self.api_url, reference.owner, reference.repo, object.sha
                    );
                    let pointer: GitPointer = self.get_json(&tag_url).await?;
                    object = pointer.object;
                },
                other => {
                    return Err(Error::Api {
                        message: format!("ref points to a {other}, not a commit"),
                        status: None,
                        url: url.to_string(),
                    });
                },
            }
        }
        return Err(Error::Api {
            message: format!("annotated tag chain deeper than {MAX_TAG_DEPTH}"),
            status: None,
            url: url.to_string(),
        });
    }
}

#[async_trait]
impl Resolver for GitHubResolver {
    async fn resolve(&self, reference: &ActionReference) -> Result<CommitSha, Error> {
        if let Some(sha) = CommitSha::parse(&reference.version) {
            return Ok(sha);
        }

        match self.lookup_ref(reference, "tags").await {
            Ok(sha) => return Ok(sha),
            Err(e) => tracing::debug!(reference = %reference, error = %e, "not a tag, trying branch"),
        }

        return self.lookup_ref(reference, "heads").await.map_err(|source| {
            return Error::UnresolvableReference {
                reference: reference.to_string(),
                source: Box::new(source),
            };
        });
    }
}

/// A 403 or 429 with an exhausted quota header.
fn is_rate_limited(status: StatusCode, headers: &reqwest::header::HeaderMap) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    return headers
        .get("x-ratelimit-remaining")
        .and_then(|value| return value.to_str().ok())
        .is_some_and(|remaining| return remaining.trim() == "0");
}
