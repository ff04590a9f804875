//! HTTP client implementation for Loxone Miniserver communication
//!
//! Plain HTTP(S) with basic authentication. One request per call and no
//! retries; retry policy belongs to the caller.

use crate::client::{
    address::Endpoint, LoxoneClient, LoxoneResponse, LoxoneStructure, STRUCTURE_PATH,
};
use crate::config::{credentials::LoxoneCredentials, LoxoneConfig};
use crate::error::{LoxoneError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use url::Url;

/// HTTP client for Loxone Miniserver
#[derive(Debug)]
pub struct LoxoneHttpClient {
    /// HTTP client instance
    client: Client,

    /// Base URL for Miniserver, always ending in `/`
    base_url: Url,

    /// Set once by `close()`
    closed: AtomicBool,
}

impl LoxoneHttpClient {
    /// Create a new HTTP client
    pub fn new(
        endpoint: &Endpoint,
        config: &LoxoneConfig,
        credentials: &LoxoneCredentials,
    ) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(format!("lox-mcp/{}", env!("CARGO_PKG_VERSION")));

        if !config.verify_ssl {
            warn!("SSL verification disabled - this is insecure for production use");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let mut default_headers = reqwest::header::HeaderMap::new();
        let header_value =
            reqwest::header::HeaderValue::from_str(&credentials.basic_auth_header()).map_err(
                |e| LoxoneError::invalid_input(format!("Invalid authorization header: {e}")),
            )?;
        default_headers.insert(reqwest::header::AUTHORIZATION, header_value);
        client_builder = client_builder.default_headers(default_headers);

        let client = client_builder
            .build()
            .map_err(|e| LoxoneError::backend(format!("Failed to build HTTP client: {e}")))?;

        info!("HTTP client ready for Loxone Miniserver at {endpoint}");

        Ok(Self {
            client,
            base_url: endpoint.base_url(),
            closed: AtomicBool::new(false),
        })
    }

    /// Build URL for API endpoint
    ///
    /// Each `/`-separated part of `path` becomes one percent-encoded segment
    /// below the base URL, so `#` and `?` stay inside the path. Dot segments
    /// are rejected.
    fn build_url(&self, path: &str) -> Result<Url> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if let Some(dots) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(LoxoneError::invalid_input(format!(
                "Invalid path segment '{dots}' in {path}"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                LoxoneError::backend(format!("Cannot append a path to {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoxoneError::backend("Connection to Miniserver is closed"));
        }
        Ok(())
    }

    /// Execute a GET request and return the body text
    async fn execute_request(&self, url: Url) -> Result<String> {
        self.ensure_open()?;
        debug!("HTTP request to {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LoxoneError::backend(format!("Failed to read response: {e}")))?;

        // The connection may have been torn down while the request was in flight.
        self.ensure_open()?;

        if !status.is_success() {
            return Err(LoxoneError::backend(format!("HTTP error {status}: {text}")));
        }

        debug!("HTTP request successful: {status}");
        Ok(text)
    }
}

#[async_trait]
impl LoxoneClient for LoxoneHttpClient {
    async fn call_raw(&self, command: &str) -> Result<String> {
        debug!("Sending command '{command}'");

        let url = self.build_url(command)?;
        let text = self.execute_request(url).await?;

        if let Some(response) = LoxoneResponse::parse(&text) {
            if !response.is_success() {
                let code = response.code().unwrap_or_default();
                let detail = match &response.body.value {
                    serde_json::Value::String(value) => value.clone(),
                    other => other.to_string(),
                };
                return Err(LoxoneError::device_control(format!(
                    "Command failed with code {code}: {detail}"
                )));
            }
        }

        Ok(text)
    }

    async fn get_structure(&self) -> Result<LoxoneStructure> {
        debug!("Fetching structure file");

        let url = self.build_url(STRUCTURE_PATH)?;
        let text = self.execute_request(url).await?;

        let structure: LoxoneStructure = serde_json::from_str(&text)
            .map_err(|e| LoxoneError::backend(format!("Malformed structure file: {e}")))?;

        debug!(
            "Structure loaded: {} controls, {} rooms, {} categories",
            structure.controls.len(),
            structure.rooms.len(),
            structure.cats.len()
        );

        Ok(structure)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Disconnected from Loxone Miniserver");
        }
        Ok(())
    }
}
