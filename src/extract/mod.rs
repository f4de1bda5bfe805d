//! Field extraction over a normalized comparison grid.
//!
//! Each [`MicroParser`] pairs a label predicate with a cell parser. For every column the pipeline
//! runs parser by parser, label by label (grid order), and writes through
//! [`FieldValues::set_if_empty`], so the first row that yields a value for a field keeps it.

pub mod assembler;
pub mod fallback;

pub use assembler::*;
pub use fallback::*;

use tracing::debug;

use crate::models::{Category, ColumnSet, Field, FieldValue, FieldValues, Grid};
use crate::parsers::{
    extract_price_tokens, parse_battery_hours, parse_chip, parse_currency_amount,
    parse_display_inches, parse_high_speed_ports, parse_ports, parse_ram_cell, parse_storage,
    parse_weight_kg,
};

pub struct MicroParser {
    pub name: &'static str,
    pub label_matches: fn(&str) -> bool,
    pub parse: fn(&str, &mut FieldValues),
}

/// Field values for one grid column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFields {
    pub column: usize,
    pub name: String,
    pub values: FieldValues,
}

pub struct FieldExtractor {
    parsers: Vec<MicroParser>,
}

impl FieldExtractor {
    pub fn for_category(category: Category) -> Self {
        let mut parsers = vec![
            MicroParser { name: "display", label_matches: display_label, parse: display_cell },
            MicroParser { name: "chip", label_matches: chip_label, parse: chip_cell },
            MicroParser { name: "memory", label_matches: memory_label, parse: memory_cell },
            MicroParser { name: "battery", label_matches: battery_label, parse: battery_cell },
            MicroParser { name: "weight", label_matches: weight_label, parse: weight_cell },
            MicroParser { name: "storage", label_matches: storage_label, parse: storage_cell },
            MicroParser { name: "ports", label_matches: ports_label, parse: ports_cell },
            MicroParser { name: "price", label_matches: price_label, parse: price_cell },
        ];

        // iPad compare grids mention the connector under the display rows.
        if category == Category::Ipad {
            parsers.push(MicroParser {
                name: "display-connector",
                label_matches: display_row_label,
                parse: display_connector_cell,
            });
        }

        Self { parsers }
    }

    pub fn parser_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name).collect()
    }

    pub fn extract_column(&self, grid: &Grid, column: usize) -> FieldValues {
        let mut values = FieldValues::new();

        for parser in &self.parsers {
            for row in grid.rows() {
                if !(parser.label_matches)(&row.label) {
                    continue;
                }
                if let Some(cell) = row.cells.get(&column) {
                    (parser.parse)(cell, &mut values);
                }
            }
        }

        values
    }

    pub fn extract(&self, grid: &Grid, columns: &ColumnSet) -> Vec<ColumnFields> {
        columns
            .iter()
            .map(|(column, name)| {
                let values = self.extract_column(grid, column);
                debug!("Column {} ({}): {} fields from grid", column, name, values.len());
                ColumnFields {
                    column,
                    name: name.to_string(),
                    values,
                }
            })
            .collect()
    }
}

fn display_label(label: &str) -> bool {
    label.contains("display")
}

fn display_row_label(label: &str) -> bool {
    label.starts_with("display")
}

fn chip_label(label: &str) -> bool {
    label.contains("processor") || label.contains("chip")
}

fn memory_label(label: &str) -> bool {
    (label.contains("memory") && !label.contains("bandwidth")) || label == "ram"
}

fn battery_label(label: &str) -> bool {
    label.contains("battery") || label.contains("power")
}

fn weight_label(label: &str) -> bool {
    label.contains("weight")
}

fn storage_label(label: &str) -> bool {
    label.contains("storage") || label.contains("capacity")
}

fn ports_label(label: &str) -> bool {
    label.contains("port") || label.contains("connector") || label.contains("connectivity")
}

fn price_label(label: &str) -> bool {
    label == "price"
}

fn display_cell(cell: &str, values: &mut FieldValues) {
    if let Some(inches) = parse_display_inches(cell) {
        values.set_if_empty(Field::DisplayInches, FieldValue::Number(inches));
    }
}

fn chip_cell(cell: &str, values: &mut FieldValues) {
    if let Some(chip) = parse_chip(cell) {
        values.set_if_empty(Field::Chip, FieldValue::Text(chip));
    }
}

fn memory_cell(cell: &str, values: &mut FieldValues) {
    if let Some(gb) = parse_ram_cell(cell) {
        values.set_if_empty(Field::RamGb, FieldValue::Number(gb));
    }
}

fn battery_cell(cell: &str, values: &mut FieldValues) {
    if let Some(hours) = parse_battery_hours(cell) {
        values.set_if_empty(Field::BatteryHours, FieldValue::Number(hours));
    }
}

fn weight_cell(cell: &str, values: &mut FieldValues) {
    if let Some(kg) = parse_weight_kg(cell) {
        values.set_if_empty(Field::WeightKg, FieldValue::Number(kg));
    }
}

fn storage_cell(cell: &str, values: &mut FieldValues) {
    let bounds = parse_storage(cell);
    if let Some(gb) = bounds.base_gb {
        values.set_if_empty(Field::StorageGb, FieldValue::Number(gb));
    }
    if let Some(tb) = bounds.top_tb {
        values.set_if_empty(Field::StorageTb, FieldValue::Number(tb));
    }
}

fn ports_cell(cell: &str, values: &mut FieldValues) {
    if let Some(ports) = parse_ports(cell) {
        values.set_if_empty(Field::Ports, FieldValue::Text(ports));
    }
}

fn display_connector_cell(cell: &str, values: &mut FieldValues) {
    if let Some(ports) = parse_high_speed_ports(cell) {
        values.set_if_empty(Field::Ports, FieldValue::Text(ports));
    }
}

fn price_cell(cell: &str, values: &mut FieldValues) {
    if let Some(price) = parse_currency_amount(cell) {
        values.set_if_empty(Field::Price, FieldValue::Price(price));
    }
    for (variant, token) in extract_price_tokens(cell) {
        values.add_token_if_empty(variant, token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Price, PriceVariant};
    use crate::parsers::{resolve_columns, ShapeRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ipad_payload() -> serde_json::Value {
        json!({
            "models": [{"displayName": "iPad Pro"}, {"displayName": "iPad Air"}],
            "sections": [{"rows": [
                {"label": "Display", "cells": ["13″ Ultra Retina XDR", "11″ Liquid Retina"]},
                {"label": "Display Connector", "cells": ["Thunderbolt / USB 4", "USB-C"]},
                {"label": "Chip", "cells": ["M4 chip", "M3 chip"]},
                {"label": "Processor", "cells": ["M2", "M1"]},
                {"label": "Storage", "cells": ["256GB, 512GB, 1TB, 2TB", "128GB, 256GB, 512GB, 1TB"]},
                {"label": "Battery and Power", "cells": ["Up to 10 hours", "Up to 10 hours"]},
                {"label": "Weight", "cells": ["579 g", "462g"]},
                {"label": "Price", "cells": ["From ₹1,29,900", "Wi-Fi {AIR_WIFI}* Wi-Fi + Cellular {AIR_CELL}*"]}
            ]}]
        })
    }

    fn extract_ipads() -> Vec<ColumnFields> {
        let payload = ipad_payload();
        let grid = ShapeRegistry::default().normalize(&payload);
        let columns = resolve_columns(&payload, &grid);
        FieldExtractor::for_category(Category::Ipad).extract(&grid, &columns)
    }

    #[test]
    fn extracts_every_field_per_column() {
        let rows = extract_ipads();
        assert_eq!(rows.len(), 2);

        let pro = &rows[0].values;
        assert_eq!(rows[0].name, "iPad Pro");
        assert_eq!(pro.get(Field::DisplayInches), Some(&FieldValue::Number(13.0)));
        assert_eq!(pro.get(Field::Chip), Some(&FieldValue::Text("M4".into())));
        assert_eq!(pro.get(Field::StorageGb), Some(&FieldValue::Number(256.0)));
        assert_eq!(pro.get(Field::StorageTb), Some(&FieldValue::Number(2.0)));
        assert_eq!(pro.get(Field::BatteryHours), Some(&FieldValue::Number(10.0)));
        assert_eq!(pro.get(Field::WeightKg), Some(&FieldValue::Number(0.579)));
        assert_eq!(pro.get(Field::Ports), Some(&FieldValue::Text("USB-C (Thunderbolt/USB 4)".into())));
        assert_eq!(
            pro.get(Field::Price),
            Some(&FieldValue::Price(Price::new(129900.0, Currency::Inr)))
        );
    }

    #[test]
    fn first_matching_label_wins() {
        let rows = extract_ipads();
        // "Chip" precedes "Processor" in the grid.
        assert_eq!(rows[1].values.get(Field::Chip), Some(&FieldValue::Text("M3".into())));
    }

    #[test]
    fn price_tokens_are_tagged() {
        let rows = extract_ipads();
        let air = &rows[1].values;

        assert_eq!(air.get(Field::Price), None);
        assert_eq!(air.price_tokens().get(&PriceVariant::Wifi).map(String::as_str), Some("AIR_WIFI"));
        assert_eq!(air.price_tokens().get(&PriceVariant::Cellular).map(String::as_str), Some("AIR_CELL"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let payload = ipad_payload();
        let grid = ShapeRegistry::default().normalize(&payload);
        let columns = resolve_columns(&payload, &grid);
        let extractor = FieldExtractor::for_category(Category::Ipad);

        assert_eq!(extractor.extract(&grid, &columns), extractor.extract(&grid, &columns));
    }

    #[test]
    fn mac_grids_skip_display_connector_rule() {
        let extractor = FieldExtractor::for_category(Category::Mac);
        assert!(!extractor.parser_names().contains(&"display-connector"));

        let payload = json!({"sections": [{"rows": [
            {"label": "Display", "cells": ["Supports one external display via Thunderbolt"]},
            {"label": "Memory", "cells": ["16GB or 24GB"]},
            {"label": "Memory bandwidth", "cells": ["120GB/s"]}
        ]}]});
        let grid = ShapeRegistry::default().normalize(&payload);
        let values = extractor.extract_column(&grid, 0);

        assert_eq!(values.get(Field::Ports), None);
        assert_eq!(values.get(Field::RamGb), Some(&FieldValue::Number(16.0)));
    }

    #[test]
    fn missing_cells_leave_fields_empty() {
        let payload = json!({"sections": [{"rows": [{"label": "Chip", "cells": ["M4"]}]}]});
        let grid = ShapeRegistry::default().normalize(&payload);

        let values = FieldExtractor::for_category(Category::Ipad).extract_column(&grid, 3);
        assert!(values.is_empty());
    }
}
