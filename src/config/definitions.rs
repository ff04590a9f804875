//! Tool and resource definitions
//!
//! The server's tools and resources are not hard-coded: they are declared in a
//! YAML document with two top-level lists, `tools` and `resources`. Each entry
//! names a handler kind that selects one of the built-in behaviors.
//!
//! ```yaml
//! tools:
//!   - name: control_device
//!     description: Control a single device
//!     parameters:
//!       - name: device_id
//!         type: string
//!         description: Device UUID
//!         required: true
//!     handler:
//!       type: control_device
//! resources:
//!   - uri: lox://rooms
//!     name: Rooms
//!     description: All rooms
//!     mimeType: application/json
//!     handler:
//!       type: rooms_list
//! ```
//!
//! A missing or malformed document never stops the server: loading falls back
//! to an empty set and logs why.

use crate::error::{LoxoneError, Result};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};

/// Document shipped with the crate, used when no path is configured
const BUNDLED_DEFINITIONS: &str = include_str!("../../config/mcp-config.yaml");

/// Root of the tool/resource document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct McpDefinitions {
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,

    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
}

/// A named, parameterized action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    pub handler: ToolHandler,
}

/// One declared tool argument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    pub name: String,

    /// JSON-Schema type tag (`string`, `number`, ...)
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, deserialize_with = "deserialize_opt_scalar")]
    pub default: Option<String>,

    #[serde(rename = "enum", default, deserialize_with = "deserialize_opt_scalars")]
    pub allowed_values: Option<Vec<String>>,
}

/// Handler block of a tool: the kind plus its static fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolHandler {
    #[serde(rename = "type")]
    pub kind: ToolHandlerKind,

    /// Fixed action used when the call does not supply one
    #[serde(default)]
    pub action: Option<String>,

    /// Fixed target (device, room, type or category) used when the call does
    /// not supply one
    #[serde(default)]
    pub target: Option<String>,

    /// Argument carrying the optional value of `control_device`
    #[serde(rename = "valueParam", alias = "value_param", default)]
    pub value_param: Option<String>,
}

/// A URI-addressed read-only view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDefinition {
    /// Concrete URI or template with `{placeholder}` segments
    pub uri: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "mimeType", alias = "mime_type", default = "default_mime_type")]
    pub mime_type: String,

    pub handler: ResourceHandler,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceHandler {
    #[serde(rename = "type")]
    pub kind: ResourceHandlerKind,
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_mime_type() -> String {
    "application/json".to_string()
}

/// Tool handler kinds
///
/// Unrecognized tags are kept as [`ToolHandlerKind::Unknown`] so that a
/// document written for a newer server still loads; calling such a tool
/// yields a failure result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolHandlerKind {
    SendCommand,
    ControlDevice,
    ControlDevicesByRoom,
    ControlDevicesByType,
    ControlDevicesByCategory,
    Unknown(String),
}

impl ToolHandlerKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SendCommand => "send_command",
            Self::ControlDevice => "control_device",
            Self::ControlDevicesByRoom => "control_devices_by_room",
            Self::ControlDevicesByType => "control_devices_by_type",
            Self::ControlDevicesByCategory => "control_devices_by_category",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for ToolHandlerKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "send_command" => Self::SendCommand,
            "control_device" => Self::ControlDevice,
            "control_devices_by_room" => Self::ControlDevicesByRoom,
            "control_devices_by_type" => Self::ControlDevicesByType,
            "control_devices_by_category" => Self::ControlDevicesByCategory,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<ToolHandlerKind> for String {
    fn from(kind: ToolHandlerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ToolHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource handler kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceHandlerKind {
    RoomsList,
    RoomDevices,
    DevicesAll,
    DevicesByType,
    DevicesByCategory,
    CategoriesList,
    StructureSummary,
    Unknown(String),
}

impl ResourceHandlerKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RoomsList => "rooms_list",
            Self::RoomDevices => "room_devices",
            Self::DevicesAll => "devices_all",
            Self::DevicesByType => "devices_by_type",
            Self::DevicesByCategory => "devices_by_category",
            Self::CategoriesList => "categories_list",
            Self::StructureSummary => "structure_summary",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for ResourceHandlerKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "rooms_list" => Self::RoomsList,
            "room_devices" => Self::RoomDevices,
            "devices_all" => Self::DevicesAll,
            "devices_by_type" => Self::DevicesByType,
            "devices_by_category" => Self::DevicesByCategory,
            "categories_list" => Self::CategoriesList,
            "structure_summary" => Self::StructureSummary,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<ResourceHandlerKind> for String {
    fn from(kind: ResourceHandlerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ResourceHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn scalar_to_string<E: serde::de::Error>(
    value: serde_yaml::Value,
) -> std::result::Result<Option<String>, E> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(E::custom("expected a string, number or boolean")),
    }
}

// YAML authors write `default: 50` as readily as `default: "50"`.
fn deserialize_opt_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        Some(value) => scalar_to_string(value),
        None => Ok(None),
    }
}

fn deserialize_opt_scalars<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(values) = Option::<Vec<serde_yaml::Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    values
        .into_iter()
        .map(|value| {
            scalar_to_string(value)?.ok_or_else(|| D::Error::custom("enum values cannot be null"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Some)
}

impl McpDefinitions {
    /// Parse a document, failing on malformed input
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(LoxoneError::from)
    }

    /// Parse a document, falling back to an empty set on malformed input
    pub fn from_yaml(yaml: &str, source: &str) -> Self {
        info!("Loading MCP configuration from {source}");
        match Self::parse(yaml) {
            Ok(definitions) => {
                info!(
                    tools = definitions.tools.len(),
                    resources = definitions.resources.len(),
                    "Loaded MCP configuration from {source}"
                );
                definitions
            }
            Err(e) => {
                error!("Failed to load configuration from {source}, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Load a document from a file; a missing file yields an empty set
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content, &format!("file {}", path.display())),
            Err(e) => {
                error!(
                    "Failed to read configuration file {}, using defaults: {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// The document shipped with the crate
    pub fn bundled() -> Self {
        Self::from_yaml(BUNDLED_DEFINITIONS, "bundled mcp-config.yaml")
    }

    /// Load from `path` when given, otherwise use the bundled document
    pub fn load_or_bundled(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty()
    }
}
