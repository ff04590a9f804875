//! Resource dispatch
//!
//! Read-only JSON projections of the structure snapshot. Parameterized
//! resources take their argument from a URI path segment, e.g. the room name
//! in `lox://rooms/Kitchen/devices`. Segments are percent-decoded.

use crate::adapter::LoxoneAdapter;
use crate::config::definitions::{ResourceDefinition, ResourceHandlerKind};
use crate::error::{ErrorReporter, LoxoneError, Result};
use crate::structure::query::{self, ControlScope};
use crate::structure::StructureSnapshot;
use rmcp::model::ResourceContents;
use serde_json::{json, Value};
use tracing::debug;

pub const MIME_JSON: &str = "application/json";
pub const MIME_TEXT: &str = "text/plain";

/// Text contents item with an explicit MIME type
fn text_contents(uri: &str, mime_type: &str, text: String) -> ResourceContents {
    let mut contents = ResourceContents::text(text, uri);
    if let ResourceContents::TextResourceContents { mime_type: slot, .. } = &mut contents {
        *slot = Some(mime_type.to_string());
    }
    contents
}

/// Text after the first `marker`, up to the first `terminator` when given
fn extract_segment(uri: &str, marker: &str, terminator: Option<&str>) -> Option<String> {
    let start = uri.find(marker)? + marker.len();
    let rest = &uri[start..];
    let segment = match terminator.and_then(|t| rest.find(t)) {
        Some(end) => &rest[..end],
        None => rest.trim_end_matches('/'),
    };

    let decoded = urlencoding::decode(segment).ok()?;
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

fn room_count(snapshot: &StructureSnapshot, room_id: &str) -> Value {
    json!(query::count_visible_controls_in_room(snapshot, room_id))
}

fn category_count(snapshot: &StructureSnapshot, category_id: &str) -> Value {
    json!(query::count_visible_controls_in_category(snapshot, category_id))
}

/// Executes one resource definition against the adapter
pub struct ResourceDispatcher<'a> {
    adapter: &'a LoxoneAdapter,
    definition: &'a ResourceDefinition,
}

impl<'a> ResourceDispatcher<'a> {
    pub fn new(adapter: &'a LoxoneAdapter, definition: &'a ResourceDefinition) -> Self {
        Self {
            adapter,
            definition,
        }
    }

    /// Read the resource at `uri`
    ///
    /// Failures come back as a `text/plain` item starting with `Error: `.
    pub async fn read(&self, uri: &str) -> ResourceContents {
        debug!(uri, handler = %self.definition.handler.kind, "Reading resource");

        match self.execute(uri).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => text_contents(uri, MIME_JSON, text),
                Err(e) => self.fail(uri, LoxoneError::from(e)),
            },
            Err(e) => self.fail(uri, e),
        }
    }

    fn fail(&self, uri: &str, error: LoxoneError) -> ResourceContents {
        ErrorReporter::log_error(&error, "resources", &self.definition.uri);
        text_contents(uri, MIME_TEXT, format!("Error: {error}"))
    }

    async fn execute(&self, uri: &str) -> Result<Value> {
        match &self.definition.handler.kind {
            ResourceHandlerKind::RoomsList => self.rooms_list().await,
            ResourceHandlerKind::RoomDevices => self.room_devices(uri).await,
            ResourceHandlerKind::DevicesAll => self.devices_all().await,
            ResourceHandlerKind::DevicesByType => self.devices_by_type(uri).await,
            ResourceHandlerKind::DevicesByCategory => self.devices_by_category(uri).await,
            ResourceHandlerKind::CategoriesList => self.categories_list().await,
            ResourceHandlerKind::StructureSummary => self.structure_summary().await,
            ResourceHandlerKind::Unknown(tag) => Err(LoxoneError::UnknownHandlerKind(tag.clone())),
        }
    }

    async fn rooms_list(&self) -> Result<Value> {
        let snapshot = self.adapter.get_structure().await?;
        let rooms: Vec<Value> = snapshot
            .rooms()
            .iter()
            .map(|room| {
                json!({
                    "uuid": room.id,
                    "name": room.name,
                    "deviceCount": room_count(&snapshot, &room.id),
                })
            })
            .collect();
        Ok(Value::Array(rooms))
    }

    async fn room_devices(&self, uri: &str) -> Result<Value> {
        let room_name = extract_segment(uri, "rooms/", Some("/devices"))
            .ok_or_else(|| LoxoneError::invalid_input("Room name not found in URI"))?;

        let snapshot = self.adapter.get_structure().await?;
        let room = query::find_room_by_name(&snapshot, &room_name)
            .ok_or_else(|| LoxoneError::not_found(format!("Room not found: {room_name}")))?;

        Ok(Value::Array(
            query::visible_controls(&snapshot, ControlScope::Room(&room.id))
                .into_iter()
                .map(|control| query::project_device(&snapshot, control, false, true))
                .collect(),
        ))
    }

    async fn devices_all(&self) -> Result<Value> {
        let snapshot = self.adapter.get_structure().await?;
        Ok(Value::Array(
            query::visible_controls(&snapshot, ControlScope::All)
                .into_iter()
                .map(|control| query::project_device(&snapshot, control, true, true))
                .collect(),
        ))
    }

    async fn devices_by_type(&self, uri: &str) -> Result<Value> {
        let device_type = extract_segment(uri, "type/", None)
            .ok_or_else(|| LoxoneError::invalid_input("Device type not found in URI"))?;

        let snapshot = self.adapter.get_structure().await?;
        Ok(Value::Array(
            query::visible_controls(&snapshot, ControlScope::Type(&device_type))
                .into_iter()
                .map(|control| query::project_device(&snapshot, control, true, true))
                .collect(),
        ))
    }

    async fn devices_by_category(&self, uri: &str) -> Result<Value> {
        let category_name = extract_segment(uri, "category/", None)
            .ok_or_else(|| LoxoneError::invalid_input("Category name not found in URI"))?;

        let snapshot = self.adapter.get_structure().await?;
        let category = query::find_category_by_name(&snapshot, &category_name).ok_or_else(|| {
            LoxoneError::not_found(format!("Category not found: {category_name}"))
        })?;

        Ok(Value::Array(
            query::visible_controls(&snapshot, ControlScope::Category(&category.id))
                .into_iter()
                .map(|control| query::project_device(&snapshot, control, true, false))
                .collect(),
        ))
    }

    async fn categories_list(&self) -> Result<Value> {
        let snapshot = self.adapter.get_structure().await?;
        let categories: Vec<Value> = snapshot
            .categories()
            .iter()
            .map(|category| {
                json!({
                    "uuid": category.id,
                    "name": category.name,
                    "type": category.category_type.as_deref().unwrap_or("unknown"),
                    "deviceCount": category_count(&snapshot, &category.id),
                })
            })
            .collect();
        Ok(Value::Array(categories))
    }

    async fn structure_summary(&self) -> Result<Value> {
        let snapshot = self.adapter.get_structure().await?;

        let room_list: Vec<Value> = snapshot
            .rooms()
            .iter()
            .map(|room| {
                json!({
                    "name": room.name,
                    "deviceCount": room_count(&snapshot, &room.id),
                })
            })
            .collect();

        let category_list: Vec<Value> = snapshot
            .categories()
            .iter()
            .map(|category| {
                json!({
                    "name": category.name,
                    "type": category.category_type.as_deref().unwrap_or("unknown"),
                    "deviceCount": category_count(&snapshot, &category.id),
                })
            })
            .collect();

        Ok(json!({
            "rooms": snapshot.rooms().len(),
            "devices": query::visible_controls(&snapshot, ControlScope::All).len(),
            "categories": snapshot.categories().len(),
            "roomList": room_list,
            "categoryList": category_list,
        }))
    }
}
