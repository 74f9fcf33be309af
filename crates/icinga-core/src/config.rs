//! Configuration structures for Icinga clients.
//!
//! This module provides the connection settings for an Icinga 2 API endpoint,
//! their defaults and validation, and loading from environment variables.

use crate::client::{
    DEFAULT_API_PORT, DEFAULT_API_VERSION, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_DELAY_SECS,
};
use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Configuration for an Icinga client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IcingaClientConfig {
    /// Icinga 2 API host name or address
    #[validate(length(min = 1))]
    #[serde(default = "default_host")]
    pub host: String,

    /// Icinga 2 API port
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// API version path segment (e.g. `v1`)
    #[validate(length(min = 1))]
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// API user for basic authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// API password for basic authentication
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Directory holding `<node>.crt`, `<node>.key` and `ca.crt`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pki_path: Option<PathBuf>,

    /// Node name used to locate client certificates (defaults to the local host name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of retries after a connection failure
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between retries in seconds
    #[validate(range(min = 0, max = 60))]
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Enable notifications on new hosts unless a request sets them
    #[serde(default)]
    pub notifications: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl IcingaClientConfig {
    /// Create a new client configuration for the given API host.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn new(host: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            host: host.into(),
            ..Self::default()
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Load the configuration from `ICINGA_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("ICINGA_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("ICINGA_API_PORT") {
            config.port = port
                .parse()
                .map_err(|e| Error::ConfigError(format!("Invalid ICINGA_API_PORT `{port}`: {e}")))?;
        }
        config.user = lookup("ICINGA_API_USER");
        config.password = lookup("ICINGA_API_PASSWORD").map(SecretString::from);
        config.pki_path = lookup("ICINGA_API_PKI_PATH").map(PathBuf::from);
        config.node_name = lookup("ICINGA_API_NODE_NAME");
        config.notifications = lookup("ICINGA_NOTIFICATIONS").is_some_and(|v| v == "true");

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set the API port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set basic authentication credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the PKI directory used for client certificates.
    #[must_use]
    pub fn with_pki_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pki_path = Some(path.into());
        self
    }

    /// Set the node name used to locate client certificates.
    #[must_use]
    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the pause between retries in seconds.
    #[must_use]
    pub const fn with_retry_delay(mut self, seconds: u64) -> Self {
        self.retry_delay_secs = seconds;
        self
    }

    /// Enable notifications on new hosts by default.
    #[must_use]
    pub const fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the retry pause as a Duration.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Node name, falling back to the local host name.
    #[must_use]
    pub fn node_name(&self) -> String {
        self.node_name
            .clone()
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned())
    }

    /// `https://<host>:<port>`, used in log and error messages.
    #[must_use]
    pub fn target(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    /// Parse the API base URL (`https://<host>:<port>/<version>`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(&self) -> Result<Url, Error> {
        Url::parse(&format!("{}/{}", self.target(), self.api_version))
            .map_err(|e| Error::ConfigError(format!("Invalid Icinga API URL: {e}")))
    }
}

impl Default for IcingaClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_version: default_api_version(),
            user: None,
            password: None,
            pki_path: None,
            node_name: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            notifications: false,
        }
    }
}
