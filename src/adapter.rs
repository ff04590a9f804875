//! Backend adapter
//!
//! [`LoxoneAdapter`] owns the lazily opened Miniserver connection and the
//! cached structure snapshot. Both are initialized single-flight: the first
//! caller does the work while holding the lock, concurrent callers wait for
//! it and share the outcome. A failure leaves the slot empty so the next call
//! retries.
//!
//! Locks are always taken in the order structure, then connection.

use crate::client::{
    address, device_command, ClientFactory, HttpClientFactory, LoxoneClient, API_VERSION_COMMAND,
};
use crate::config::{credentials::LoxoneCredentials, LoxoneConfig, ServerConfig};
use crate::error::Result;
use crate::structure::StructureSnapshot;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mediates all access to the Miniserver
pub struct LoxoneAdapter {
    config: LoxoneConfig,
    credentials: LoxoneCredentials,
    factory: Arc<dyn ClientFactory>,
    connection: Mutex<Option<Arc<dyn LoxoneClient>>>,
    structure: Mutex<Option<Arc<StructureSnapshot>>>,
}

impl LoxoneAdapter {
    /// Adapter talking HTTP to the configured Miniserver
    pub fn new(config: LoxoneConfig, credentials: LoxoneCredentials) -> Self {
        Self::with_factory(config, credentials, Arc::new(HttpClientFactory))
    }

    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self::new(config.loxone.clone(), config.credentials.clone())
    }

    /// Adapter using a custom client factory
    pub fn with_factory(
        config: LoxoneConfig,
        credentials: LoxoneCredentials,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            config,
            credentials,
            factory,
            connection: Mutex::new(None),
            structure: Mutex::new(None),
        }
    }

    /// Current connection, opening it on first use
    async fn client(&self) -> Result<Arc<dyn LoxoneClient>> {
        let mut connection = self.connection.lock().await;
        if let Some(client) = connection.as_ref() {
            return Ok(Arc::clone(client));
        }

        let endpoint = address::resolve(&self.config.address)?;
        debug!(
            "Creating client with endpoint: {endpoint} (resolved from {})",
            self.config.address
        );

        let client = self
            .factory
            .connect(&endpoint, &self.config, &self.credentials)
            .await?;
        *connection = Some(Arc::clone(&client));

        info!("Connected to Loxone Miniserver at {}", self.config.address);
        Ok(client)
    }

    /// API version of the Miniserver; used as a liveness probe, never cached
    pub async fn get_api_version(&self) -> Result<String> {
        self.call_raw(API_VERSION_COMMAND).await
    }

    /// Structure snapshot, fetched once and cached until [`close`](Self::close)
    pub async fn get_structure(&self) -> Result<Arc<StructureSnapshot>> {
        let mut structure = self.structure.lock().await;
        if let Some(snapshot) = structure.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        info!("Fetching structure from Miniserver");
        let client = self.client().await?;
        let raw = client.get_structure().await?;
        let snapshot = Arc::new(StructureSnapshot::from_structure(&raw));
        *structure = Some(Arc::clone(&snapshot));

        info!(
            rooms = snapshot.rooms().len(),
            categories = snapshot.categories().len(),
            controls = snapshot.controls().len(),
            "Structure cached: lastModified={}",
            snapshot.last_modified
        );
        Ok(snapshot)
    }

    /// Send `command` to the control addressed by `target`
    pub async fn send_command(&self, target: &str, command: &str) -> Result<String> {
        self.call_raw(&device_command(target, command)).await
    }

    /// Execute a raw command path
    pub async fn call_raw(&self, command: &str) -> Result<String> {
        debug!("Executing raw command: {command}");
        let client = self.client().await?;
        client.call_raw(command).await
    }

    /// Drop the cached structure and release the connection
    ///
    /// Safe to call repeatedly and while other calls are in flight; those
    /// calls fail with `BackendUnavailable`.
    pub async fn close(&self) -> Result<()> {
        let mut structure = self.structure.lock().await;
        let mut connection = self.connection.lock().await;

        structure.take();
        if let Some(client) = connection.take() {
            if let Err(e) = client.close().await {
                warn!("Error while closing Miniserver connection: {e}");
            }
            info!("Loxone connection closed");
        }
        Ok(())
    }

    /// Whether a connection is currently open
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}
