//! Tool and resource registry
//!
//! Built once at startup from the loaded definitions. Tools are looked up by
//! name, resources by URI. Resource URIs may be templates whose `{name}`
//! placeholders each match one path segment, possibly empty.

use crate::config::definitions::{
    McpDefinitions, ParameterSpec, ResourceDefinition, ToolDefinition,
};
use regex::Regex;
use rmcp::model::{AnnotateAble, JsonObject, RawResource, Resource, ResourceTemplate, Tool};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

fn is_template(uri: &str) -> bool {
    uri.contains('{') && uri.contains('}')
}

/// Regex matching concrete URIs of a template
fn template_regex(template: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let close = rest[open..].find('}')? + open;
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str("[^/]*");
        rest = &rest[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    Regex::new(&pattern).ok()
}

fn typed_default(parameter: &ParameterSpec, default: &str) -> Value {
    match parameter.param_type.as_str() {
        "integer" => default.parse::<i64>().map_or_else(|_| json!(default), |n| json!(n)),
        "number" => default.parse::<f64>().map_or_else(|_| json!(default), |n| json!(n)),
        "boolean" => default.parse::<bool>().map_or_else(|_| json!(default), |b| json!(b)),
        _ => json!(default),
    }
}

/// JSON Schema of a tool's arguments
pub fn input_schema(tool: &ToolDefinition) -> JsonObject {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for parameter in &tool.parameters {
        let mut property = Map::new();
        property.insert("type".into(), json!(parameter.param_type));
        property.insert("description".into(), json!(parameter.description));
        if let Some(allowed) = &parameter.allowed_values {
            property.insert("enum".into(), json!(allowed));
        }
        if let Some(default) = &parameter.default {
            property.insert("default".into(), typed_default(parameter, default));
        }
        properties.insert(parameter.name.clone(), Value::Object(property));

        if parameter.required {
            required.push(parameter.name.clone());
        }
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema
}

/// Lookup tables for tools and resources
#[derive(Debug, Default)]
pub struct Registry {
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
    templates: Vec<(Regex, usize)>,
}

impl Registry {
    /// Build the registry; on duplicate names or URIs the first definition wins
    pub fn new(definitions: McpDefinitions) -> Self {
        let mut names = HashSet::new();
        let mut tools = Vec::new();
        for tool in definitions.tools {
            if names.insert(tool.name.clone()) {
                tools.push(tool);
            } else {
                warn!("Duplicate tool '{}' ignored", tool.name);
            }
        }

        let mut uris = HashSet::new();
        let mut resources = Vec::new();
        let mut templates = Vec::new();
        for resource in definitions.resources {
            if !uris.insert(resource.uri.clone()) {
                warn!("Duplicate resource '{}' ignored", resource.uri);
                continue;
            }
            if is_template(&resource.uri) {
                match template_regex(&resource.uri) {
                    Some(regex) => templates.push((regex, resources.len())),
                    None => {
                        warn!("Malformed resource template '{}' ignored", resource.uri);
                        continue;
                    }
                }
            }
            resources.push(resource);
        }

        info!(
            "Registered {} tools and {} resources",
            tools.len(),
            resources.len()
        );

        Self {
            tools,
            resources,
            templates,
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Resource serving `uri`: an exact match first, then the first template
    pub fn find_resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources
            .iter()
            .find(|resource| resource.uri == uri)
            .or_else(|| {
                self.templates
                    .iter()
                    .find(|(regex, _)| regex.is_match(uri))
                    .map(|&(_, index)| &self.resources[index])
            })
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|tool| {
                Tool::new(
                    tool.name.clone(),
                    tool.description.clone(),
                    Arc::new(input_schema(tool)),
                )
            })
            .collect()
    }

    /// Concrete (non-template) resources
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .filter(|resource| !is_template(&resource.uri))
            .map(|resource| {
                let mut raw = RawResource::new(resource.uri.clone(), resource.name.clone());
                raw.description = Some(resource.description.clone());
                raw.mime_type = Some(resource.mime_type.clone());
                raw.no_annotation()
            })
            .collect()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates
            .iter()
            .filter_map(|&(_, index)| {
                let resource = &self.resources[index];
                let template = json!({
                    "uriTemplate": resource.uri,
                    "name": resource.name,
                    "description": resource.description,
                    "mimeType": resource.mime_type,
                });
                serde_json::from_value(template)
                    .map_err(|e| warn!("Resource template '{}' skipped: {e}", resource.uri))
                    .ok()
            })
            .collect()
    }
}
