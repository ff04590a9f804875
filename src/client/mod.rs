//! Loxone Miniserver client boundary
//!
//! The adapter never talks HTTP itself. It goes through [`LoxoneClient`],
//! created by a [`ClientFactory`], so tests can swap in the mock client.

pub mod address;
pub mod http_client;

use crate::config::{credentials::LoxoneCredentials, LoxoneConfig};
use crate::error::Result;
use address::Endpoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Raw command that reports the Miniserver API version
pub const API_VERSION_COMMAND: &str = "jdev/cfg/api";

/// Path of the structure file
pub const STRUCTURE_PATH: &str = "data/LoxAPP3.json";

/// Device control command for a target and action
pub fn device_command(target: &str, command: &str) -> String {
    format!("jdev/sps/io/{target}/{command}")
}

/// Loxone structure file data (`LoxAPP3.json`)
///
/// Maps keep document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoxoneStructure {
    /// Last modified timestamp
    #[serde(rename = "lastModified", default)]
    pub last_modified: String,

    /// Room definitions
    #[serde(default)]
    pub rooms: Map<String, Value>,

    /// Categories
    #[serde(default)]
    pub cats: Map<String, Value>,

    /// All controls/devices
    #[serde(default)]
    pub controls: Map<String, Value>,
}

/// Command response envelope: `{"LL": {"control": .., "value": .., "Code": ..}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoxoneResponse {
    #[serde(rename = "LL")]
    pub body: LoxoneResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoxoneResponseBody {
    #[serde(default)]
    pub control: String,

    #[serde(default)]
    pub value: Value,

    /// Status code; the Miniserver sends it as a string or a number
    #[serde(rename = "Code", alias = "code", default)]
    pub code: Value,
}

impl LoxoneResponse {
    /// Parse a response body, `None` when it is not an `LL` envelope
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Numeric status code, if present
    pub fn code(&self) -> Option<u16> {
        match &self.body.code {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code().map_or(true, |code| code == 200)
    }
}

/// Trait for Loxone client implementations
#[async_trait]
pub trait LoxoneClient: Send + Sync {
    /// Execute a raw command path and return the response text
    async fn call_raw(&self, command: &str) -> Result<String>;

    /// Get the structure file (LoxAPP3.json)
    async fn get_structure(&self) -> Result<LoxoneStructure>;

    /// Release the connection; later calls fail
    async fn close(&self) -> Result<()>;
}

/// Opens clients for a resolved endpoint
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        config: &LoxoneConfig,
        credentials: &LoxoneCredentials,
    ) -> Result<Arc<dyn LoxoneClient>>;
}

/// Factory for [`http_client::LoxoneHttpClient`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        config: &LoxoneConfig,
        credentials: &LoxoneCredentials,
    ) -> Result<Arc<dyn LoxoneClient>> {
        let client = http_client::LoxoneHttpClient::new(endpoint, config, credentials)?;
        Ok(Arc::new(client))
    }
}
