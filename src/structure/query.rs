//! Pure queries over a [`StructureSnapshot`]
//!
//! Shared by the tool and resource dispatchers. Nothing here does I/O.

use super::{Category, Control, Room, StructureSnapshot};
use serde_json::{json, Map, Value};

/// Which controls a listing or bulk action covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlScope<'a> {
    All,
    /// Controls in the room with this id
    Room(&'a str),
    /// Controls with this type, compared case-insensitively
    Type(&'a str),
    /// Controls in the category with this id
    Category(&'a str),
}

impl ControlScope<'_> {
    fn contains(&self, control: &Control) -> bool {
        match self {
            ControlScope::All => true,
            ControlScope::Room(id) => control.room_id.as_deref() == Some(*id),
            ControlScope::Type(name) => names_match(&control.control_type, name),
            ControlScope::Category(id) => control.category_id.as_deref() == Some(*id),
        }
    }
}

/// Case-insensitive name comparison
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// First room whose name matches, in document order
///
/// Duplicate names are possible in a structure file; the first one wins.
pub fn find_room_by_name<'a>(snapshot: &'a StructureSnapshot, name: &str) -> Option<&'a Room> {
    snapshot.rooms().iter().find(|room| names_match(&room.name, name))
}

/// First category whose name matches, in document order
pub fn find_category_by_name<'a>(
    snapshot: &'a StructureSnapshot,
    name: &str,
) -> Option<&'a Category> {
    snapshot
        .categories()
        .iter()
        .find(|category| names_match(&category.name, name))
}

/// Visible controls in `scope`, in document order
pub fn visible_controls<'a>(
    snapshot: &'a StructureSnapshot,
    scope: ControlScope<'_>,
) -> Vec<&'a Control> {
    snapshot
        .controls()
        .iter()
        .filter(|control| control.is_visible() && scope.contains(control))
        .collect()
}

pub fn count_visible_controls_in_room(snapshot: &StructureSnapshot, room_id: &str) -> usize {
    visible_controls(snapshot, ControlScope::Room(room_id)).len()
}

pub fn count_visible_controls_in_category(
    snapshot: &StructureSnapshot,
    category_id: &str,
) -> usize {
    visible_controls(snapshot, ControlScope::Category(category_id)).len()
}

/// JSON view of a control: `uuid`, `name`, `type`, plus the room and category
/// names when requested and resolvable
pub fn project_device(
    snapshot: &StructureSnapshot,
    control: &Control,
    include_room: bool,
    include_category: bool,
) -> Value {
    let mut device = Map::new();
    device.insert("uuid".into(), json!(control.action_id));
    device.insert("name".into(), json!(control.name));
    device.insert("type".into(), json!(control.control_type));

    if include_room {
        if let Some(room) = snapshot.room_name(control) {
            device.insert("room".into(), json!(room));
        }
    }
    if include_category {
        if let Some(category) = snapshot.category_name(control) {
            device.insert("category".into(), json!(category));
        }
    }

    Value::Object(device)
}
