//! Process configuration for the Atlas client and provisioner.

use std::time::Duration;

/// Default API root, including the versioned path prefix.
pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v1.0";

/// Per-request timeout applied to the shared HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Sleep between convergence polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Upper bound on a single convergence wait. Zero disables the deadline.
pub const DEFAULT_CONVERGENCE_TIMEOUT_SECS: u64 = 3600;

/// API credentials: the account username and its programmatic API key.
///
/// Immutable once loaded and shared read-only by every request. The [`Debug`]
/// impl redacts the key so it never reaches log output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    api_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for a provisioning process.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// Username and API key used for digest authentication.
    pub credentials: Credentials,

    /// Organization that newly created groups belong to.
    pub org_id: String,

    /// API root, e.g. `https://cloud.mongodb.com/api/atlas/v1.0`.
    pub base_url: String,

    /// Timeout for each individual HTTP call.
    pub request_timeout_secs: u64,

    /// Sleep between convergence polls.
    pub poll_interval_secs: u64,

    /// Deadline for one convergence wait; `0` means wait indefinitely.
    pub convergence_timeout_secs: u64,
}

impl AtlasConfig {
    /// Build a configuration with default tunables.
    pub fn new(credentials: Credentials, org_id: impl Into<String>) -> Self {
        Self {
            credentials,
            org_id: org_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            convergence_timeout_secs: DEFAULT_CONVERGENCE_TIMEOUT_SECS,
        }
    }

    /// Override the API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Lets tests supply variables without touching the process environment.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let username = read_required(&reader, "ATLAS_USERNAME")?;
        let api_key = read_required(&reader, "ATLAS_API_KEY")?;
        let org_id = read_required(&reader, "ATLAS_ORG_ID")?;

        let base_url = reader("ATLAS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidValue("ATLAS_BASE_URL".into(), e.to_string()))?;

        let request_timeout_secs = read_secs(
            &reader,
            "ATLAS_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        require_positive("ATLAS_REQUEST_TIMEOUT_SECS", request_timeout_secs)?;

        let poll_interval_secs = read_secs(
            &reader,
            "ATLAS_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        require_positive("ATLAS_POLL_INTERVAL_SECS", poll_interval_secs)?;

        let convergence_timeout_secs = read_secs(
            &reader,
            "ATLAS_CONVERGENCE_TIMEOUT_SECS",
            DEFAULT_CONVERGENCE_TIMEOUT_SECS,
        )?;

        Ok(Self {
            credentials: Credentials::new(username, api_key),
            org_id,
            base_url,
            request_timeout_secs,
            poll_interval_secs,
            convergence_timeout_secs,
        })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Convergence deadline, or `None` when disabled.
    #[must_use]
    pub fn convergence_timeout(&self) -> Option<Duration> {
        (self.convergence_timeout_secs > 0)
            .then(|| Duration::from_secs(self.convergence_timeout_secs))
    }
}

fn read_required<F>(reader: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    reader(key).map_err(|_| ConfigError::MissingVar(key.into()))
}

fn read_secs<F>(reader: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(key.into(), "must be greater than zero".into()));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
