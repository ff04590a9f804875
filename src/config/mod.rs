//! Configuration management for the Loxone MCP server
//!
//! Two kinds of configuration exist:
//!
//! - [`ServerConfig`]: process configuration (Miniserver address, credentials,
//!   timeouts), read from the environment at startup.
//! - [`definitions::McpDefinitions`]: the declarative tool/resource document.

pub mod credentials;
pub mod definitions;

use crate::client::address::{self, Endpoint};
use crate::error::{LoxoneError, Result};
use credentials::LoxoneCredentials;
use std::{env, path::PathBuf, time::Duration};

/// Environment variable holding the Miniserver address
pub const ENV_HOST: &str = "LOXONE_HOST";
/// Environment variable holding the Miniserver username
pub const ENV_USER: &str = "LOXONE_USER";
/// Environment variable holding the Miniserver password
pub const ENV_PASS: &str = "LOXONE_PASS";

/// Default HTTP transport port; the CLI reads `MCP_PORT` for the `http` command
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Loxone Miniserver configuration
    pub loxone: LoxoneConfig,

    /// Credentials for basic authentication
    pub credentials: LoxoneCredentials,

    /// Path of the tool/resource document; `None` uses the bundled one
    pub definitions_path: Option<PathBuf>,
}

/// Loxone Miniserver configuration
#[derive(Debug, Clone)]
pub struct LoxoneConfig {
    /// Address as configured: IP[:port], Miniserver MAC, or URL
    pub address: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Enable SSL/TLS verification
    pub verify_ssl: bool,
}

impl LoxoneConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_secs(30),
            verify_ssl: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            env::var(ENV_HOST).ok(),
            env::var(ENV_USER).ok(),
            env::var(ENV_PASS).ok(),
        )
    }

    /// Build configuration from explicitly supplied credentials, reading the
    /// optional settings from the environment
    ///
    /// Every missing required value is reported in one error.
    pub fn from_values(
        host: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let missing: Vec<&str> = [
            (ENV_HOST, host.is_none()),
            (ENV_USER, username.is_none()),
            (ENV_PASS, password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(host), Some(username), Some(password)) = (host, username, password) else {
            return Err(LoxoneError::config(format!(
                "Missing required environment variable(s): {}",
                missing.join(", ")
            )));
        };

        let mut loxone = LoxoneConfig::new(host);

        if let Ok(timeout) = env::var("LOXONE_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| LoxoneError::config(format!("Invalid LOXONE_TIMEOUT: {e}")))?;
            loxone.timeout = Duration::from_secs(seconds);
        }

        if let Ok(verify) = env::var("LOXONE_VERIFY_SSL") {
            loxone.verify_ssl = !matches!(verify.to_lowercase().as_str(), "false" | "0" | "no");
        }

        let definitions_path = env::var("LOXONE_MCP_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            loxone,
            credentials: LoxoneCredentials::new(username, password),
            definitions_path,
        })
    }

    /// Validate configuration
    ///
    /// Resolves the configured address so a malformed `LOXONE_HOST` is
    /// reported at startup rather than on the first tool call.
    pub fn validate(&self) -> Result<Endpoint> {
        if self.loxone.timeout.is_zero() {
            return Err(LoxoneError::config("Timeout must be greater than zero"));
        }

        if self.credentials.username.is_empty() {
            return Err(LoxoneError::config("Username cannot be empty"));
        }

        address::resolve(&self.loxone.address)
    }
}
