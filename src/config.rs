use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file consulted when no `--config` path is given.
pub const JIRA_CONFIG_FILE: &str = "jira_config.json";

const ENV_BASE_URL: &str = "JIRA_BASE_URL";
const ENV_EMAIL: &str = "JIRA_EMAIL";
const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_results() -> u32 {
    25
}

/// Credentials and tuning for the Jira REST collaborator.
///
/// Values come from a JSON config file with environment variables taking
/// precedence, so a deployment can keep the API token out of the file
/// entirely. `.env` files are honored by the binary before loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Site base URL, e.g. `https://your-site.atlassian.net`.
    pub base_url: String,

    /// Account email used for basic auth.
    pub email: String,

    /// API token paired with the email.
    pub api_token: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cap applied to search and comment listings when the caller does not
    /// pass one.
    #[serde(default = "default_max_results")]
    pub default_max_results: u32,
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required setting {setting} (set it in the config file or as {env_var})")]
    Missing {
        setting: &'static str,
        env_var: &'static str,
    },
}

/// File-level view of the config where everything is optional; credentials
/// may arrive from the environment instead.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    base_url: Option<String>,
    email: Option<String>,
    api_token: Option<String>,
    request_timeout_secs: Option<u64>,
    default_max_results: Option<u32>,
}

impl JiraConfig {
    /// Load configuration from `path` (or the default file if present) and
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &|name| std::env::var(name).ok())
    }

    fn load_with_env(
        path: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut partial = match path {
            // An explicitly named file must exist.
            Some(path) => Self::read_file(path)?,
            None => {
                let default_path = Path::new(JIRA_CONFIG_FILE);
                if default_path.exists() {
                    Self::read_file(default_path)?
                } else {
                    PartialConfig::default()
                }
            }
        };

        if let Some(base_url) = env(ENV_BASE_URL) {
            partial.base_url = Some(base_url);
        }
        if let Some(email) = env(ENV_EMAIL) {
            partial.email = Some(email);
        }
        if let Some(api_token) = env(ENV_API_TOKEN) {
            partial.api_token = Some(api_token);
        }

        let base_url = partial.base_url.ok_or(ConfigError::Missing {
            setting: "base_url",
            env_var: ENV_BASE_URL,
        })?;
        let email = partial.email.ok_or(ConfigError::Missing {
            setting: "email",
            env_var: ENV_EMAIL,
        })?;
        let api_token = partial.api_token.ok_or(ConfigError::Missing {
            setting: "api_token",
            env_var: ENV_API_TOKEN,
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
            request_timeout_secs: partial
                .request_timeout_secs
                .unwrap_or_else(default_timeout_secs),
            default_max_results: partial
                .default_max_results
                .unwrap_or_else(default_max_results),
        })
    }

    fn read_file(path: &Path) -> Result<PartialConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
