/*!
 * Configuration
 *
 * Connection parameters for the root resource and runtime-wide settings.
 * Both load from environment variables or JSON files and fall back to the
 * defaults in `core::limits`.
 */

use crate::core::limits;
use crate::core::types::Timeout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parameters for connecting to a host
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectParams {
    /// Native service provider constant
    pub host_type: i32,
    /// Host name; `None` means the local host
    pub host_name: Option<String>,
    pub host_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Native host options bitmask
    pub options: i32,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host_type: limits::DEFAULT_SERVICE_PROVIDER,
            host_name: None,
            host_port: limits::DEFAULT_HOST_PORT,
            username: None,
            password: None,
            options: 0,
        }
    }
}

// Password never reaches the logs
impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host_type", &self.host_type)
            .field("host_name", &self.host_name)
            .field("host_port", &self.host_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("options", &self.options)
            .finish()
    }
}

impl ConnectParams {
    /// Parameters for the local host with no explicit credentials
    pub fn local() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_host_type(mut self, host_type: i32) -> Self {
        self.host_type = host_type;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_host(mut self, name: impl Into<String>, port: u16) -> Self {
        self.host_name = Some(name.into());
        self.host_port = port;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: i32) -> Self {
        self.options = options;
        self
    }

    /// Load from environment variables
    ///
    /// - VIX_HOST_TYPE: service provider constant
    /// - VIX_HOST / VIX_PORT: remote host and port
    /// - VIX_USER / VIX_PASSWORD: credentials
    /// - VIX_HOST_OPTIONS: host options bitmask
    pub fn from_env() -> ConfigResult<Self> {
        let mut params = Self::default();

        if let Some(v) = env_var("VIX_HOST_TYPE") {
            params.host_type = parse_var("VIX_HOST_TYPE", &v)?;
        }
        params.host_name = env_var("VIX_HOST");
        if let Some(v) = env_var("VIX_PORT") {
            params.host_port = parse_var("VIX_PORT", &v)?;
        }
        params.username = env_var("VIX_USER");
        params.password = env_var("VIX_PASSWORD");
        if let Some(v) = env_var("VIX_HOST_OPTIONS") {
            params.options = parse_var("VIX_HOST_OPTIONS", &v)?;
        }

        Ok(params)
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Runtime-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wait timeout for host-wide searches
    pub find_timeout: Timeout,
    /// Wait timeout used by `Vm::wait_for_tools` when none is given
    pub tools_timeout: Timeout,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            find_timeout: limits::DEFAULT_FIND_TIMEOUT,
            tools_timeout: limits::DEFAULT_TOOLS_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    #[inline]
    #[must_use]
    pub fn with_find_timeout(mut self, timeout: Timeout) -> Self {
        self.find_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tools_timeout(mut self, timeout: Timeout) -> Self {
        self.tools_timeout = timeout;
        self
    }

    /// Load from environment variables
    ///
    /// - VIX_FIND_TIMEOUT_SECS: timeout for host-wide searches
    /// - VIX_TOOLS_TIMEOUT_SECS: timeout for guest tools
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(v) = env_var("VIX_FIND_TIMEOUT_SECS") {
            config.find_timeout = Timeout::Seconds(parse_var("VIX_FIND_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = env_var("VIX_TOOLS_TIMEOUT_SECS") {
            config.tools_timeout = Timeout::Seconds(parse_var("VIX_TOOLS_TIMEOUT_SECS", &v)?);
        }
        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        var,
        value: value.to_string(),
    })
}
