//! Tool dispatch
//!
//! A [`ToolDispatcher`] is bound to one [`ToolDefinition`] and the shared
//! adapter. Each call runs validate, execute, format and always yields a
//! [`CallToolResult`]; errors never escape this module.
//!
//! Argument values are resolved in this order: the call's argument, the
//! handler's static field (`action`, `target`), the parameter's declared
//! default. Anything still missing is a missing parameter.

use crate::adapter::LoxoneAdapter;
use crate::config::definitions::{ToolDefinition, ToolHandlerKind};
use crate::error::{ErrorReporter, LoxoneError, Result};
use crate::structure::query::{self, ControlScope};
use crate::structure::Control;
use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_VALUE_PARAM: &str = "value";

fn success(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

pub(crate) fn failure(text: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

/// Text shown to the client for a failed call
pub(crate) fn failure_text(error: &LoxoneError) -> String {
    match error {
        LoxoneError::MissingParameter(_)
        | LoxoneError::NotFound(_)
        | LoxoneError::InvalidInput(_)
        | LoxoneError::UnknownHandlerKind(_) => error.to_string(),
        _ => format!("Error: {error}"),
    }
}

/// Argument whose value the handler's static `target` field supplies
fn target_param(kind: &ToolHandlerKind) -> Option<&'static str> {
    match kind {
        ToolHandlerKind::SendCommand => Some("uuid"),
        ToolHandlerKind::ControlDevice => Some("device_id"),
        ToolHandlerKind::ControlDevicesByRoom => Some("room"),
        ToolHandlerKind::ControlDevicesByType => Some("device_type"),
        ToolHandlerKind::ControlDevicesByCategory => Some("category"),
        ToolHandlerKind::Unknown(_) => None,
    }
}

fn scalar_argument(name: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(LoxoneError::invalid_input(format!(
            "Parameter '{name}' must be a string, number or boolean"
        ))),
    }
}

/// Typed view over a call's argument map
struct ToolArguments<'a> {
    definition: &'a ToolDefinition,
    arguments: &'a JsonObject,
}

impl<'a> ToolArguments<'a> {
    fn static_value(&self, name: &str) -> Option<&'a str> {
        let handler = &self.definition.handler;
        if name == "action" {
            return handler.action.as_deref();
        }
        if target_param(&handler.kind) == Some(name) {
            return handler.target.as_deref();
        }
        None
    }

    fn declared_default(&self, name: &str) -> Option<&'a str> {
        self.definition
            .parameters
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_deref())
    }

    fn optional(&self, name: &str) -> Result<Option<String>> {
        if let Some(value) = self.arguments.get(name) {
            if let Some(value) = scalar_argument(name, value)? {
                return Ok(Some(value));
            }
        }
        Ok(self
            .static_value(name)
            .or_else(|| self.declared_default(name))
            .map(str::to_string))
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)?
            .ok_or_else(|| LoxoneError::missing_parameter(name))
    }

    /// Declared-required parameters and `enum` constraints
    fn validate(&self) -> Result<()> {
        for parameter in &self.definition.parameters {
            let value = self.optional(&parameter.name)?;

            if parameter.required && value.is_none() {
                return Err(LoxoneError::missing_parameter(&parameter.name));
            }

            if let (Some(value), Some(allowed)) = (&value, &parameter.allowed_values) {
                if !allowed.contains(value) {
                    return Err(LoxoneError::invalid_input(format!(
                        "Invalid value '{value}' for parameter '{}'. Allowed values: {}",
                        parameter.name,
                        allowed.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Executes one tool definition against the adapter
pub struct ToolDispatcher<'a> {
    adapter: &'a LoxoneAdapter,
    definition: &'a ToolDefinition,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(adapter: &'a LoxoneAdapter, definition: &'a ToolDefinition) -> Self {
        Self {
            adapter,
            definition,
        }
    }

    /// Run the tool with the given arguments
    pub async fn dispatch(&self, arguments: &JsonObject) -> CallToolResult {
        debug!(
            tool = %self.definition.name,
            handler = %self.definition.handler.kind,
            "Dispatching tool call"
        );

        match self.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                ErrorReporter::log_error(&e, "tools", &self.definition.name);
                failure(failure_text(&e))
            }
        }
    }

    async fn execute(&self, arguments: &JsonObject) -> Result<CallToolResult> {
        let kind = &self.definition.handler.kind;
        if let ToolHandlerKind::Unknown(tag) = kind {
            return Err(LoxoneError::UnknownHandlerKind(tag.clone()));
        }

        let args = ToolArguments {
            definition: self.definition,
            arguments,
        };
        args.validate()?;

        match kind {
            ToolHandlerKind::SendCommand => self.send_command(&args).await,
            ToolHandlerKind::ControlDevice => self.control_device(&args).await,
            ToolHandlerKind::ControlDevicesByRoom => self.control_devices_by_room(&args).await,
            ToolHandlerKind::ControlDevicesByType => self.control_devices_by_type(&args).await,
            ToolHandlerKind::ControlDevicesByCategory => {
                self.control_devices_by_category(&args).await
            }
            ToolHandlerKind::Unknown(tag) => Err(LoxoneError::UnknownHandlerKind(tag.clone())),
        }
    }

    async fn send_command(&self, args: &ToolArguments<'_>) -> Result<CallToolResult> {
        let uuid = args.required("uuid")?;
        let command = args.required("command")?;

        let response = self.adapter.send_command(&uuid, &command).await?;
        Ok(success(format!("Command sent successfully: {response}")))
    }

    async fn control_device(&self, args: &ToolArguments<'_>) -> Result<CallToolResult> {
        let device_id = args.required("device_id")?;
        let action = args.required("action")?;
        let value_param = self
            .definition
            .handler
            .value_param
            .as_deref()
            .unwrap_or(DEFAULT_VALUE_PARAM);
        let value = args.optional(value_param)?;

        let command = match &value {
            Some(value) => format!("{action}/{value}"),
            None => action.clone(),
        };

        let response = self.adapter.send_command(&device_id, &command).await?;
        Ok(success(format!("Device {device_id} {action}: {response}")))
    }

    async fn control_devices_by_room(&self, args: &ToolArguments<'_>) -> Result<CallToolResult> {
        let room_name = args.required("room")?;
        let action = args.required("action")?;
        let device_type = args.optional("device_type")?;

        let snapshot = self.adapter.get_structure().await?;
        let room = query::find_room_by_name(&snapshot, &room_name)
            .ok_or_else(|| LoxoneError::not_found(format!("Room not found: {room_name}")))?;

        let controls: Vec<&Control> =
            query::visible_controls(&snapshot, ControlScope::Room(&room.id))
                .into_iter()
                .filter(|control| {
                    device_type
                        .as_deref()
                        .map_or(true, |t| query::names_match(&control.control_type, t))
                })
                .collect();

        if controls.is_empty() {
            return Ok(failure(format!("No devices found in room: {room_name}")));
        }

        let lines = self.bulk_execute(&controls, &action).await;
        Ok(bulk_result(format!("in {room_name}"), &lines))
    }

    async fn control_devices_by_type(&self, args: &ToolArguments<'_>) -> Result<CallToolResult> {
        let device_type = args.required("device_type")?;
        let action = args.required("action")?;

        let snapshot = self.adapter.get_structure().await?;
        let controls = query::visible_controls(&snapshot, ControlScope::Type(&device_type));

        if controls.is_empty() {
            return Ok(failure(format!("No devices found of type: {device_type}")));
        }

        let lines = self.bulk_execute(&controls, &action).await;
        Ok(bulk_result(format!("of type {device_type}"), &lines))
    }

    async fn control_devices_by_category(
        &self,
        args: &ToolArguments<'_>,
    ) -> Result<CallToolResult> {
        let category_name = args.required("category")?;
        let action = args.required("action")?;

        let snapshot = self.adapter.get_structure().await?;
        let category = query::find_category_by_name(&snapshot, &category_name).ok_or_else(|| {
            LoxoneError::not_found(format!("Category not found: {category_name}"))
        })?;

        let controls = query::visible_controls(&snapshot, ControlScope::Category(&category.id));

        if controls.is_empty() {
            return Ok(failure(format!(
                "No devices found in category: {category_name}"
            )));
        }

        let lines = self.bulk_execute(&controls, &action).await;
        Ok(bulk_result(format!("in category {category_name}"), &lines))
    }

    /// Send `action` to each control in order, one outcome line per control
    async fn bulk_execute(&self, controls: &[&Control], action: &str) -> Vec<String> {
        let mut lines = Vec::with_capacity(controls.len());

        for control in controls {
            let line = match self.adapter.send_command(&control.action_id, action).await {
                Ok(_) => format!("{}: OK", control.name),
                Err(e) => {
                    warn!(
                        tool = %self.definition.name,
                        device = %control.action_id,
                        "Bulk action failed for {}: {e}",
                        control.name
                    );
                    format!("{}: {e}", control.name)
                }
            };
            lines.push(line);
        }

        lines
    }
}

fn bulk_result(scope: String, lines: &[String]) -> CallToolResult {
    success(format!(
        "Controlled {} devices {scope}:\n{}",
        lines.len(),
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::credentials::LoxoneCredentials;
    use crate::config::definitions::{ParameterSpec, ToolHandler};
    use crate::config::LoxoneConfig;
    use crate::mock::{result_text, sample_structure, MockClientFactory, MockLoxoneClient};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn adapter(client: MockLoxoneClient) -> (LoxoneAdapter, Arc<MockClientFactory>) {
        let factory = Arc::new(MockClientFactory::new(
            client.with_structure(sample_structure()),
        ));
        let adapter = LoxoneAdapter::with_factory(
            LoxoneConfig::new("192.168.1.77"),
            LoxoneCredentials::new("admin", "secret"),
            factory.clone(),
        );
        (adapter, factory)
    }

    fn tool(kind: &str) -> ToolDefinition {
        ToolDefinition {
            name: format!("test_{kind}"),
            description: String::new(),
            parameters: Vec::new(),
            handler: ToolHandler {
                kind: ToolHandlerKind::from(kind.to_string()),
                action: None,
                target: None,
                value_param: None,
            },
        }
    }

    fn parameter(name: &str) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            param_type: "string".into(),
            description: String::new(),
            required: false,
            default: None,
            allowed_values: None,
        }
    }

    fn args(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }

    fn is_error(result: &CallToolResult) -> bool {
        result.is_error == Some(true)
    }

    async fn call(
        adapter: &LoxoneAdapter,
        definition: &ToolDefinition,
        arguments: Value,
    ) -> CallToolResult {
        ToolDispatcher::new(adapter, definition)
            .dispatch(&args(arguments))
            .await
    }

    #[tokio::test]
    async fn test_send_command() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let result = call(
            &adapter,
            &tool("send_command"),
            json!({"uuid": "abc", "command": "pulse"}),
        )
        .await;

        assert!(!is_error(&result));
        assert!(result_text(&result).starts_with("Command sent successfully: "));
        assert_eq!(factory.client().commands(), vec!["jdev/sps/io/abc/pulse"]);
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_before_backend_access() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let result = call(&adapter, &tool("send_command"), json!({"command": "pulse"})).await;

        assert!(is_error(&result));
        assert_eq!(result_text(&result), "Missing required parameter: uuid");
        assert_eq!(factory.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_control_device_without_and_with_value() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let definition = tool("control_device");

        let result = call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "action": "On"}),
        )
        .await;
        assert!(result_text(&result).starts_with("Device abc On: "));

        call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "action": "On", "value": "50"}),
        )
        .await;
        call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "action": "Dim", "value": 75}),
        )
        .await;

        assert_eq!(
            factory.client().commands(),
            vec![
                "jdev/sps/io/abc/On",
                "jdev/sps/io/abc/On/50",
                "jdev/sps/io/abc/Dim/75"
            ]
        );
    }

    #[tokio::test]
    async fn test_control_device_custom_value_param_and_static_action() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let mut definition = tool("control_device");
        definition.handler.action = Some("Dim".into());
        definition.handler.value_param = Some("brightness".into());

        let result = call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "brightness": 30}),
        )
        .await;

        assert!(!is_error(&result));
        assert_eq!(factory.client().commands(), vec!["jdev/sps/io/abc/Dim/30"]);
    }

    #[tokio::test]
    async fn test_argument_wins_over_static_field_and_default() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let mut definition = tool("control_device");
        definition.handler.target = Some("fixed-device".into());
        let mut action = parameter("action");
        action.default = Some("Off".into());
        definition.parameters.push(action);

        call(&adapter, &definition, json!({})).await;
        call(
            &adapter,
            &definition,
            json!({"device_id": "other", "action": "On"}),
        )
        .await;

        assert_eq!(
            factory.client().commands(),
            vec!["jdev/sps/io/fixed-device/Off", "jdev/sps/io/other/On"]
        );
    }

    #[tokio::test]
    async fn test_declared_required_and_enum_are_enforced() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let mut definition = tool("control_device");
        let mut action = parameter("action");
        action.allowed_values = Some(vec!["On".into(), "Off".into()]);
        let mut note = parameter("note");
        note.required = true;
        definition.parameters = vec![action, note];

        let result = call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "action": "On"}),
        )
        .await;
        assert_eq!(result_text(&result), "Missing required parameter: note");

        let result = call(
            &adapter,
            &definition,
            json!({"device_id": "abc", "action": "Explode", "note": "x"}),
        )
        .await;
        assert!(is_error(&result));
        assert_eq!(
            result_text(&result),
            "Invalid input: Invalid value 'Explode' for parameter 'action'. Allowed values: On, Off"
        );
        assert!(factory.client().commands().is_empty());
    }

    #[tokio::test]
    async fn test_control_devices_by_room() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let result = call(
            &adapter,
            &tool("control_devices_by_room"),
            json!({"room": "kitchen", "action": "Off"}),
        )
        .await;

        assert!(!is_error(&result));
        assert_eq!(
            result_text(&result),
            "Controlled 2 devices in kitchen:\nKitchen Ceiling: OK\nKitchen Blind: OK"
        );
        assert_eq!(
            factory.client().commands(),
            vec!["jdev/sps/io/kitchen-light/Off", "jdev/sps/io/kitchen-blind/Off"]
        );
    }

    #[tokio::test]
    async fn test_control_devices_by_room_filters_type() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let result = call(
            &adapter,
            &tool("control_devices_by_room"),
            json!({"room": "Kitchen", "action": "FullUp", "device_type": "jalousie"}),
        )
        .await;

        assert_eq!(
            result_text(&result),
            "Controlled 1 devices in Kitchen:\nKitchen Blind: OK"
        );
        assert_eq!(
            factory.client().commands(),
            vec!["jdev/sps/io/kitchen-blind/FullUp"]
        );
    }

    #[tokio::test]
    async fn test_missing_room_and_empty_room_are_distinct_failures() {
        let (adapter, _factory) = adapter(MockLoxoneClient::new());
        let definition = tool("control_devices_by_room");

        let missing = call(
            &adapter,
            &definition,
            json!({"room": "Garage", "action": "Off"}),
        )
        .await;
        assert!(is_error(&missing));
        assert_eq!(result_text(&missing), "Room not found: Garage");

        let empty = call(
            &adapter,
            &definition,
            json!({"room": "Storage", "action": "Off"}),
        )
        .await;
        assert!(is_error(&empty));
        assert_eq!(result_text(&empty), "No devices found in room: Storage");
    }

    #[tokio::test]
    async fn test_bulk_partial_failure_reports_every_target() {
        let (adapter, _factory) =
            adapter(MockLoxoneClient::new().with_failing_target("kitchen-blind"));
        let result = call(
            &adapter,
            &tool("control_devices_by_room"),
            json!({"room": "Kitchen", "action": "Off"}),
        )
        .await;

        assert!(!is_error(&result));
        let text = result_text(&result);
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Kitchen Ceiling: OK");
        assert!(lines[1].starts_with("Kitchen Blind: "));
        assert!(lines[1].contains("Command failed"));
    }

    #[tokio::test]
    async fn test_control_devices_by_type() {
        let (adapter, _factory) = adapter(MockLoxoneClient::new());
        let definition = tool("control_devices_by_type");

        let result = call(
            &adapter,
            &definition,
            json!({"device_type": "Jalousie", "action": "FullDown"}),
        )
        .await;
        assert_eq!(
            result_text(&result),
            "Controlled 2 devices of type Jalousie:\nKitchen Blind: OK\nLiving Blind: OK"
        );

        let result = call(
            &adapter,
            &definition,
            json!({"device_type": "Sauna", "action": "On"}),
        )
        .await;
        assert!(is_error(&result));
        assert_eq!(result_text(&result), "No devices found of type: Sauna");
    }

    #[tokio::test]
    async fn test_control_devices_by_category() {
        let (adapter, _factory) = adapter(MockLoxoneClient::new());
        let definition = tool("control_devices_by_category");

        let result = call(
            &adapter,
            &definition,
            json!({"category": "lighting", "action": "Off"}),
        )
        .await;
        assert_eq!(
            result_text(&result),
            "Controlled 2 devices in category lighting:\nKitchen Ceiling: OK\nLiving Lamp: OK"
        );

        let empty = call(
            &adapter,
            &definition,
            json!({"category": "Security", "action": "Off"}),
        )
        .await;
        assert_eq!(
            result_text(&empty),
            "No devices found in category: Security"
        );

        let missing = call(
            &adapter,
            &definition,
            json!({"category": "Audio", "action": "Off"}),
        )
        .await;
        assert_eq!(result_text(&missing), "Category not found: Audio");
    }

    #[tokio::test]
    async fn test_unknown_handler_kind() {
        let (adapter, factory) = adapter(MockLoxoneClient::new());
        let result = call(&adapter, &tool("make_it_dance"), json!({})).await;

        assert!(is_error(&result));
        assert_eq!(result_text(&result), "Unknown handler type: make_it_dance");
        assert_eq!(factory.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_error_result() {
        let (adapter, _factory) = adapter(MockLoxoneClient::new().failing_structure_fetches(1));
        let result = call(
            &adapter,
            &tool("control_devices_by_type"),
            json!({"device_type": "Jalousie", "action": "Up"}),
        )
        .await;

        assert!(is_error(&result));
        assert_eq!(
            result_text(&result),
            "Error: Backend unavailable: Structure file unavailable"
        );
    }

    #[tokio::test]
    async fn test_non_scalar_argument_is_rejected() {
        let (adapter, _factory) = adapter(MockLoxoneClient::new());
        let result = call(
            &adapter,
            &tool("send_command"),
            json!({"uuid": ["a"], "command": "On"}),
        )
        .await;

        assert!(is_error(&result));
        assert!(result_text(&result).starts_with("Invalid input: Parameter 'uuid'"));
    }
}
