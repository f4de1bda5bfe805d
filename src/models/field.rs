use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{Currency, Price};

/// Product specification fields resolved per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Chip,
    RamGb,
    StorageGb,
    StorageTb,
    BatteryHours,
    WeightKg,
    Price,
    Ports,
    DisplayInches,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Chip,
        Field::RamGb,
        Field::StorageGb,
        Field::StorageTb,
        Field::BatteryHours,
        Field::WeightKg,
        Field::Price,
        Field::Ports,
        Field::DisplayInches,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::Chip => "chip",
            Field::RamGb => "ram_gb",
            Field::StorageGb => "storage_gb",
            Field::StorageTb => "storage_tb",
            Field::BatteryHours => "battery_hours",
            Field::WeightKg => "weight_kg",
            Field::Price => "price",
            Field::Ports => "ports",
            Field::DisplayInches => "display_inches",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Field::Chip | Field::Ports)
    }

    /// Natural-language instruction handed to the semantic extractor.
    pub fn instruction(&self, currency: Currency) -> String {
        match self {
            Field::Chip => "Chip string like 'M4', 'M3 Pro', 'A16', 'A17 Pro'.".to_string(),
            Field::RamGb => "Base memory (RAM) in GB as a number.".to_string(),
            Field::StorageGb => "Base storage (smallest capacity) in GB as a number.".to_string(),
            Field::StorageTb => "Largest storage option in TB as a number (e.g., 2).".to_string(),
            Field::BatteryHours => "Battery life claim in hours as a number.".to_string(),
            Field::WeightKg => "Wi-Fi model weight in kilograms as a number (e.g., 0.444).".to_string(),
            Field::Price => format!(
                "'From' price in {} ({}) as a number without separators (e.g., 99900).",
                currency.code(),
                currency.symbol()
            ),
            Field::Ports => "Either 'USB-C' or 'USB-C (Thunderbolt/USB 4)'.".to_string(),
            Field::DisplayInches => "Diagonal display size in inches as a float (e.g., 11.1).".to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Price(Price),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<Price> {
        match self {
            FieldValue::Price(p) => Some(*p),
            _ => None,
        }
    }
}

/// Which variant a price placeholder token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceVariant {
    Wifi,
    Cellular,
}

impl fmt::Display for PriceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceVariant::Wifi => write!(f, "wifi"),
            PriceVariant::Cellular => write!(f, "cellular"),
        }
    }
}

pub type PriceTokens = BTreeMap<PriceVariant, String>;

/// Field values found for one product. Values are write-once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: BTreeMap<Field, FieldValue>,
    price_tokens: PriceTokens,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` unless `field` already holds one. Returns whether it was stored.
    pub fn set_if_empty(&mut self, field: Field, value: FieldValue) -> bool {
        if self.values.contains_key(&field) {
            return false;
        }
        self.values.insert(field, value);
        true
    }

    pub fn add_token_if_empty(&mut self, variant: PriceVariant, token: String) {
        self.price_tokens.entry(variant).or_insert(token);
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn price_tokens(&self) -> &PriceTokens {
        &self.price_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.price_tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn into_parts(self) -> (BTreeMap<Field, FieldValue>, PriceTokens) {
        (self.values, self.price_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_value_wins() {
        let mut values = FieldValues::new();
        assert!(values.set_if_empty(Field::Chip, FieldValue::Text("M4".into())));
        assert!(!values.set_if_empty(Field::Chip, FieldValue::Text("M3".into())));

        assert_eq!(values.get(Field::Chip).and_then(FieldValue::as_text), Some("M4"));
    }

    #[test]
    fn field_keys_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("price_inr"), None);
    }

    #[test]
    fn price_instruction_names_currency() {
        let text = Field::Price.instruction(Currency::Inr);
        assert!(text.contains("INR"));
        assert!(text.contains('₹'));
    }
}
