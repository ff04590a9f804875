//! Typed view of the Miniserver structure file
//!
//! [`StructureSnapshot`] is built once from the raw `LoxAPP3.json` document and
//! never mutated afterwards. Rooms, categories and controls keep the order in
//! which the document lists them, so every listing and every "first match"
//! lookup is deterministic.

pub mod query;

use crate::client::LoxoneStructure;
use serde_json::Value;
use std::collections::HashMap;

/// A room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub name: String,
}

/// A category (lighting, shading, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub category_type: Option<String>,
}

/// One control from the structure file
///
/// Room and category are weak references by id, resolved on demand through
/// the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Key of the control in the structure file
    pub id: String,
    /// UUID commands are addressed to (`uuidAction`)
    pub action_id: String,
    pub name: String,
    /// Type tag; empty for structural entries
    pub control_type: String,
    pub room_id: Option<String>,
    pub category_id: Option<String>,
}

impl Control {
    /// Controls with an empty type are internal and never listed or targeted
    pub fn is_visible(&self) -> bool {
        !self.control_type.is_empty()
    }
}

/// Immutable device topology
#[derive(Debug, Clone, Default)]
pub struct StructureSnapshot {
    pub last_modified: String,
    rooms: Vec<Room>,
    categories: Vec<Category>,
    controls: Vec<Control>,
    room_index: HashMap<String, usize>,
    category_index: HashMap<String, usize>,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn non_empty_field(value: &Value, key: &str) -> Option<String> {
    str_field(value, key).filter(|s| !s.is_empty())
}

impl StructureSnapshot {
    pub fn new(
        last_modified: impl Into<String>,
        rooms: Vec<Room>,
        categories: Vec<Category>,
        controls: Vec<Control>,
    ) -> Self {
        let room_index = rooms
            .iter()
            .enumerate()
            .map(|(i, room)| (room.id.clone(), i))
            .collect();
        let category_index = categories
            .iter()
            .enumerate()
            .map(|(i, category)| (category.id.clone(), i))
            .collect();

        Self {
            last_modified: last_modified.into(),
            rooms,
            categories,
            controls,
            room_index,
            category_index,
        }
    }

    /// Build the typed snapshot from the raw structure document
    pub fn from_structure(structure: &LoxoneStructure) -> Self {
        let rooms = structure
            .rooms
            .iter()
            .map(|(id, room)| Room {
                id: str_field(room, "uuid").unwrap_or_else(|| id.clone()),
                name: str_field(room, "name").unwrap_or_default(),
            })
            .collect();

        let categories = structure
            .cats
            .iter()
            .map(|(id, cat)| Category {
                id: str_field(cat, "uuid").unwrap_or_else(|| id.clone()),
                name: str_field(cat, "name").unwrap_or_default(),
                category_type: non_empty_field(cat, "type"),
            })
            .collect();

        let controls = structure
            .controls
            .iter()
            .map(|(id, control)| Control {
                id: id.clone(),
                action_id: non_empty_field(control, "uuidAction").unwrap_or_else(|| id.clone()),
                name: str_field(control, "name").unwrap_or_default(),
                control_type: str_field(control, "type").unwrap_or_default(),
                room_id: non_empty_field(control, "room"),
                category_id: non_empty_field(control, "cat"),
            })
            .collect();

        Self::new(structure.last_modified.clone(), rooms, categories, controls)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All controls, including invisible ones
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_index.get(id).map(|&i| &self.rooms[i])
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.category_index.get(id).map(|&i| &self.categories[i])
    }

    /// Name of the room a control belongs to
    pub fn room_name(&self, control: &Control) -> Option<&str> {
        control
            .room_id
            .as_deref()
            .and_then(|id| self.room(id))
            .map(|room| room.name.as_str())
    }

    /// Name of the category a control belongs to
    pub fn category_name(&self, control: &Control) -> Option<&str> {
        control
            .category_id
            .as_deref()
            .and_then(|id| self.category(id))
            .map(|category| category.name.as_str())
    }
}
