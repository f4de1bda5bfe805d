use serde_json::Value;

use super::clean_text;
use crate::models::{ColumnSet, Grid};

const NAME_FIELDS: [&str; 3] = ["displayName", "name", "title"];

/// Product names from a comparison payload, in column order.
///
/// Containers are tried as `models`, `columns`, then `grid.columns`; the first one that yields a
/// name wins. Returns an empty list when nothing matches.
pub fn resolve_column_names(payload: &Value) -> Vec<String> {
    let containers = [
        payload.get("models"),
        payload.get("columns"),
        payload.get("grid").and_then(|grid| grid.get("columns")),
    ];

    for container in containers.into_iter().flatten() {
        let Some(descriptors) = container.as_array() else {
            continue;
        };
        let names: Vec<String> = descriptors.iter().filter_map(descriptor_name).collect();
        if !names.is_empty() {
            return names;
        }
    }

    Vec::new()
}

/// Resolved names padded to the grid width.
pub fn resolve_columns(payload: &Value, grid: &Grid) -> ColumnSet {
    ColumnSet::from_names(resolve_column_names(payload), grid)
}

fn descriptor_name(descriptor: &Value) -> Option<String> {
    NAME_FIELDS
        .iter()
        .filter_map(|field| descriptor.get(*field).and_then(Value::as_str))
        .map(clean_text)
        .find(|name| !name.is_empty())
}
