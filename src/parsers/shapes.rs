//! Comparison payload shapes.
//!
//! Compare pages ship their table as JSON whose layout changes between releases. Each known
//! layout gets a [`ShapeMatcher`]; the [`ShapeRegistry`] tries them in order and keeps the first
//! non-empty [`Grid`]. Payloads nobody recognizes produce an empty grid.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::{clean_text, normalize_label};
use crate::models::Grid;

pub trait ShapeMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap structural check; `map` is only called when this returns true.
    fn accepts(&self, payload: &Value) -> bool;

    /// Build the grid. Malformed rows are skipped, never reported.
    fn map(&self, payload: &Value) -> Grid;
}

/// `{"sections": [{"rows": [{"label": .., "cells": [..]}]}]}`
pub struct SectionsShape;

impl ShapeMatcher for SectionsShape {
    fn name(&self) -> &'static str {
        "sections"
    }

    fn accepts(&self, payload: &Value) -> bool {
        payload.get("sections").map_or(false, Value::is_array)
    }

    fn map(&self, payload: &Value) -> Grid {
        let rows = payload
            .get("sections")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|section| section.get("rows").and_then(Value::as_array))
            .flatten();

        rows_to_grid(rows, &["label", "title"], &["cells", "values"])
    }
}

/// `{"grid": {"rows": [{"key": .., "values": [..]}], "columns": [..]}}`
pub struct GridShape;

impl ShapeMatcher for GridShape {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn accepts(&self, payload: &Value) -> bool {
        payload.get("grid").map_or(false, Value::is_object)
    }

    fn map(&self, payload: &Value) -> Grid {
        let rows = payload
            .get("grid")
            .and_then(|grid| grid.get("rows"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten();

        rows_to_grid(rows, &["key", "label"], &["values", "cells"])
    }
}

/// Ordered set of shape matchers.
pub struct ShapeRegistry {
    matchers: Vec<Box<dyn ShapeMatcher>>,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self {
            matchers: vec![Box::new(SectionsShape), Box::new(GridShape)],
        }
    }
}

impl ShapeRegistry {
    pub fn empty() -> Self {
        Self { matchers: Vec::new() }
    }

    /// Appends a matcher; it is tried after every matcher already registered.
    pub fn register(&mut self, matcher: Box<dyn ShapeMatcher>) {
        self.matchers.push(matcher);
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    pub fn normalize(&self, payload: &Value) -> Grid {
        for matcher in &self.matchers {
            if !matcher.accepts(payload) {
                continue;
            }
            let grid = matcher.map(payload);
            if !grid.is_empty() {
                debug!("Payload matched '{}' shape with {} rows", matcher.name(), grid.len());
                return grid;
            }
        }
        Grid::new()
    }
}

/// Shared row walker: label from the first non-empty string among `label_fields`,
/// cells from the first non-empty array among `value_fields`.
pub fn rows_to_grid<'a>(
    rows: impl Iterator<Item = &'a Value>,
    label_fields: &[&str],
    value_fields: &[&str],
) -> Grid {
    let mut grid = Grid::new();

    for row in rows {
        let Some(raw_label) = first_string(row, label_fields) else {
            continue;
        };
        let label = normalize_label(&clean_text(raw_label));
        if label.is_empty() || label.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let Some(values) = first_array(row, value_fields) else {
            continue;
        };
        let cells: BTreeMap<usize, String> = values
            .iter()
            .enumerate()
            .map(|(index, value)| (index, cell_text(value)))
            .collect();

        grid.insert(label, cells);
    }

    grid
}

/// Text form of one cell; nested values are serialized to JSON first.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => clean_text(s),
        Value::Null => String::new(),
        other => clean_text(&other.to_string()),
    }
}

fn first_string<'a>(row: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| row.get(*field).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

fn first_array<'a>(row: &'a Value, fields: &[&str]) -> Option<&'a Vec<Value>> {
    fields
        .iter()
        .filter_map(|field| row.get(*field).and_then(Value::as_array))
        .find(|values| !values.is_empty())
}
