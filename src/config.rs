use std::path::Path;

use crate::error::Error;

/// Public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Run budget used when neither the flag nor the config sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Name of the optional config file in the scanned directory.
pub const CONFIG_FILE: &str = ".actpin.toml";

/// Project configuration loaded from `.actpin.toml`.
/// Include/exclude patterns are path prefixes applied to workflow files.
#[derive(Debug, Default)]
pub struct Config {
    /// Base URL of the GitHub REST API.
    pub api_url: Option<String>,
    /// Prefixes of workflow paths to skip.
    pub exclude: Vec<String>,
    /// Prefixes of workflow paths to process; empty means all.
    pub include: Vec<String>,
    /// Default run budget in seconds.
    pub timeout: Option<u64>,
}

/// Raw TOML structure for `.actpin.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ActpinTomlConfig {
    /// See [`Config::api_url`].
    api_url: Option<String>,
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::timeout`].
    timeout: Option<u64>,
}

impl Config {
    /// API base URL by precedence: explicit flag, `GITHUB_API_URL`, config file, default.
    pub fn api_url(&self, flag: Option<&str>) -> String {
        let from_env = std::env::var("GITHUB_API_URL").ok().filter(|url| return !url.is_empty());
        let chosen = flag
            .map(str::to_string)
            .or(from_env)
            .or_else(|| return self.api_url.clone())
            .unwrap_or_else(|| return DEFAULT_API_URL.to_string());
        return chosen.trim_end_matches('/').to_string();
    }

    /// Load config from `.actpin.toml` in the given root directory.
    /// Returns a default that processes every workflow if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::ConfigInvalid` for a zero timeout.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let raw: ActpinTomlConfig = toml::from_str(&content)?;
        if raw.timeout == Some(0) {
            return Err(Error::ConfigInvalid { reason: "timeout must be at least 1 second".to_string() });
        }
        tracing::debug!(path = %path.display(), "loaded config");
        return Ok(Self {
            api_url: raw.api_url,
            exclude: raw.exclude,
            include: raw.include,
            timeout: raw.timeout,
        });
    }

    /// Check whether a workflow file path should be processed.
    ///
    /// A path is included if no include patterns are set,
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_process(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Run budget by precedence: explicit flag, config file, default.
    pub fn timeout_secs(&self, flag: Option<u64>) -> u64 {
        return flag.or(self.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
    }
}
