//! Mock implementations for testing
//!
//! [`MockLoxoneClient`] records every command it receives and can be told to
//! fail for specific targets, fail the next structure fetches, or respond
//! slowly. [`MockClientFactory`] hands out one shared mock client and counts
//! connection attempts.

use crate::client::{address::Endpoint, ClientFactory, LoxoneClient, LoxoneStructure};
use crate::config::{credentials::LoxoneCredentials, LoxoneConfig};
use crate::error::{LoxoneError, Result};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock Loxone client for testing
#[derive(Debug, Default)]
pub struct MockLoxoneClient {
    structure: Option<LoxoneStructure>,
    failing_targets: HashSet<String>,
    structure_failures: AtomicUsize,
    latency: Option<Duration>,
    commands: Mutex<Vec<String>>,
    structure_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockLoxoneClient {
    /// Create new mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Set mock structure data
    pub fn with_structure(mut self, structure: LoxoneStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Commands addressed to `target` fail with a device control error
    pub fn with_failing_target(mut self, target: impl Into<String>) -> Self {
        self.failing_targets.insert(target.into());
        self
    }

    /// The next `count` structure fetches fail with `BackendUnavailable`
    pub fn failing_structure_fetches(self, count: usize) -> Self {
        self.structure_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Raw commands received so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    pub fn structure_calls(&self) -> usize {
        self.structure_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LoxoneError::backend("Connection to Miniserver is closed"));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn target_of(command: &str) -> Option<&str> {
        command.strip_prefix("jdev/sps/io/")?.split('/').next()
    }
}

#[async_trait]
impl LoxoneClient for MockLoxoneClient {
    async fn call_raw(&self, command: &str) -> Result<String> {
        self.ensure_open()?;
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.to_string());
        }
        self.simulate_latency().await;
        self.ensure_open()?;

        if let Some(target) = Self::target_of(command) {
            if self.failing_targets.contains(target) {
                return Err(LoxoneError::device_control(format!(
                    "Command failed with code 500: {target}"
                )));
            }
        }

        let value = if command == crate::client::API_VERSION_COMMAND {
            "{'snr': '50:4F:94:A0:02:10', 'version':'14.5.12.7'}"
        } else {
            "1"
        };

        Ok(json!({"LL": {"control": command, "value": value, "Code": "200"}}).to_string())
    }

    async fn get_structure(&self) -> Result<LoxoneStructure> {
        self.ensure_open()?;
        self.structure_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let should_fail = self
            .structure_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(LoxoneError::backend("Structure file unavailable"));
        }

        self.structure
            .clone()
            .ok_or_else(|| LoxoneError::backend("No structure available in mock"))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out one shared [`MockLoxoneClient`]
#[derive(Debug)]
pub struct MockClientFactory {
    client: Arc<MockLoxoneClient>,
    connect_calls: AtomicUsize,
}

impl MockClientFactory {
    pub fn new(client: MockLoxoneClient) -> Self {
        Self {
            client: Arc::new(client),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> &MockLoxoneClient {
        &self.client
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _config: &LoxoneConfig,
        _credentials: &LoxoneCredentials,
    ) -> Result<Arc<dyn LoxoneClient>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent first callers actually overlap.
        tokio::task::yield_now().await;
        Ok(self.client.clone())
    }
}

/// Text items of a tool result, joined by newlines
pub fn result_text(result: &CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap_or_default();
    value["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Structure used across tests
///
/// * Kitchen: a light, a blind and one internal control
/// * Living Room: a light and a blind
/// * Storage: only an internal control
/// * Security category: no controls at all
pub fn sample_structure() -> LoxoneStructure {
    let document = json!({
        "lastModified": "2024-05-01 12:00:00",
        "rooms": {
            "room-kitchen": {"uuid": "room-kitchen", "name": "Kitchen"},
            "room-living": {"uuid": "room-living", "name": "Living Room"},
            "room-storage": {"uuid": "room-storage", "name": "Storage"}
        },
        "cats": {
            "cat-lights": {"uuid": "cat-lights", "name": "Lighting", "type": "lights"},
            "cat-shading": {"uuid": "cat-shading", "name": "Shading", "type": "shading"},
            "cat-security": {"uuid": "cat-security", "name": "Security"}
        },
        "controls": {
            "ctrl-kitchen-light": {
                "uuidAction": "kitchen-light",
                "name": "Kitchen Ceiling",
                "type": "LightControllerV2",
                "room": "room-kitchen",
                "cat": "cat-lights"
            },
            "ctrl-kitchen-blind": {
                "uuidAction": "kitchen-blind",
                "name": "Kitchen Blind",
                "type": "Jalousie",
                "room": "room-kitchen",
                "cat": "cat-shading"
            },
            "ctrl-kitchen-internal": {
                "uuidAction": "kitchen-internal",
                "name": "Kitchen Internal",
                "type": "",
                "room": "room-kitchen",
                "cat": "cat-lights"
            },
            "ctrl-living-light": {
                "uuidAction": "living-light",
                "name": "Living Lamp",
                "type": "LightControllerV2",
                "room": "room-living",
                "cat": "cat-lights"
            },
            "ctrl-living-blind": {
                "uuidAction": "living-blind",
                "name": "Living Blind",
                "type": "Jalousie",
                "room": "room-living",
                "cat": "cat-shading"
            },
            "ctrl-storage-internal": {
                "uuidAction": "storage-internal",
                "name": "Storage Sensor",
                "type": "",
                "room": "room-storage"
            }
        }
    });

    serde_json::from_value(document).unwrap_or_default()
}
