use tracing::debug;

use super::fallback::{ResolutionState, Tier};
use crate::models::{Category, Currency, Field, FieldValues, ProductRecord};

/// Identity and fallbacks for one record.
#[derive(Debug, Clone)]
pub struct RecordContext<'a> {
    pub name: &'a str,
    pub category: Category,
    pub url: Option<&'a str>,
    pub note: Option<&'a str>,
    /// Default values in priority order (family before lineup).
    pub defaults: Vec<&'a FieldValues>,
}

pub struct RecordAssembler {
    currency: Currency,
}

impl RecordAssembler {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    pub fn assemble(&self, context: &RecordContext<'_>, mut state: ResolutionState) -> ProductRecord {
        for defaults in &context.defaults {
            state.fill_all((*defaults).clone(), Tier::Default);
        }

        let mut record = ProductRecord::empty(context.name, context.category.refine(context.name));
        record.url = context.url.map(str::to_string);
        record.chip = state.text(Field::Chip).map(str::to_string);
        record.ram_gb = state.number(Field::RamGb);
        record.storage_gb = state.number(Field::StorageGb);
        record.storage_tb = state.number(Field::StorageTb);
        record.battery_hours = state.number(Field::BatteryHours);
        record.weight_kg = state.number(Field::WeightKg);
        record.ports = state.text(Field::Ports).map(str::to_string);
        record.display_inches = state.number(Field::DisplayInches);

        let mut notes: Vec<String> = context.note.map(str::to_string).into_iter().collect();

        match state.price() {
            Some(price) if price.currency == self.currency => record.price = Some(price),
            Some(price) => notes.push(format!("price quoted in {} ({}), not {}", price.currency, price, self.currency)),
            None => {}
        }

        let tokens = state.price_tokens();
        if !tokens.is_empty() {
            let listed: Vec<String> = tokens
                .iter()
                .map(|(variant, token)| format!("{}={}", variant, token))
                .collect();
            notes.push(format!("price tokens: {}", listed.join(", ")));
        }

        if !notes.is_empty() {
            record.notes = Some(notes.join("; "));
        }

        debug!(
            "Assembled {}: {} of {} fields resolved",
            record.name,
            Field::ALL.len() - state.unresolved().len(),
            Field::ALL.len()
        );
        record
    }
}
