use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::models::{Currency, Field, FieldValue, FieldValues, Price, PriceTokens};
use crate::parsers::{
    clean_text, parse_battery_hours, parse_chip, parse_display_inches, parse_ports,
    parse_ram_text, parse_storage_text, parse_weight_kg, PriceRule,
};
use crate::semantic::{FieldManifest, SemanticExtractor};

static ANSWER_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?")
        .expect("Invalid answer number regex")
});

/// Where a resolved value came from, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Structured,
    PageText,
    Semantic,
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Structured => write!(f, "structured"),
            Tier::PageText => write!(f, "page-text"),
            Tier::Semantic => write!(f, "semantic"),
            Tier::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: FieldValue,
    pub tier: Tier,
}

/// Per-record `(value, tier)` table. A field, once filled, keeps its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionState {
    fields: BTreeMap<Field, Resolved>,
    price_tokens: PriceTokens,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_structured(values: FieldValues) -> Self {
        let mut state = Self::new();
        state.fill_all(values, Tier::Structured);
        state
    }

    pub fn fill(&mut self, field: Field, value: FieldValue, tier: Tier) -> bool {
        if self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, Resolved { value, tier });
        true
    }

    pub fn fill_all(&mut self, values: FieldValues, tier: Tier) {
        let (values, tokens) = values.into_parts();
        for (field, value) in values {
            self.fill(field, value, tier);
        }
        for (variant, token) in tokens {
            self.price_tokens.entry(variant).or_insert(token);
        }
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field).map(|r| &r.value)
    }

    pub fn tier(&self, field: Field) -> Option<Tier> {
        self.fields.get(&field).map(|r| r.tier)
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn price(&self) -> Option<Price> {
        self.get(Field::Price).and_then(FieldValue::as_price)
    }

    pub fn price_tokens(&self) -> &PriceTokens {
        &self.price_tokens
    }

    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.is_resolved(*field))
            .collect()
    }
}

/// Page material available to the text and semantic tiers for one record.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub product_name: &'a str,
    /// Spec-bearing texts in preference order (marketing page before buy page).
    pub texts: Vec<&'a str>,
    /// Text the price rule runs over, usually the buy page.
    pub price_text: Option<&'a str>,
    pub price_rule: PriceRule,
}

impl<'a> PageContext<'a> {
    pub fn without_pages(product_name: &'a str) -> Self {
        Self {
            product_name,
            texts: Vec::new(),
            price_text: None,
            price_rule: PriceRule::FromPrice,
        }
    }
}

/// Resolves fields tier by tier: structured grid, page text, semantic extractor.
pub struct FallbackChain<'a> {
    currency: Currency,
    semantic: Option<&'a dyn SemanticExtractor>,
}

impl<'a> FallbackChain<'a> {
    pub fn new(currency: Currency) -> Self {
        Self { currency, semantic: None }
    }

    pub fn with_semantic(mut self, extractor: Option<&'a dyn SemanticExtractor>) -> Self {
        self.semantic = extractor;
        self
    }

    pub async fn resolve(&self, structured: FieldValues, page: &PageContext<'_>) -> ResolutionState {
        let mut state = ResolutionState::from_structured(structured);
        self.apply_page_text(&mut state, page);
        self.apply_semantic(&mut state, page).await;
        state
    }

    pub fn apply_page_text(&self, state: &mut ResolutionState, page: &PageContext<'_>) {
        for field in state.unresolved() {
            if field == Field::Price {
                continue;
            }
            let found = page.texts.iter().find_map(|text| parse_text_field(field, text));
            if let Some(value) = found {
                state.fill(field, value, Tier::PageText);
            }
        }

        // Price last: size-dependent rules need the display size resolved above.
        if !state.is_resolved(Field::Price) {
            if let Some(text) = page.price_text {
                let display = state.number(Field::DisplayInches);
                if let Some(amount) = page.price_rule.resolve(text, self.currency, page.product_name, display) {
                    state.fill(Field::Price, FieldValue::Price(Price::new(amount, self.currency)), Tier::PageText);
                }
            }
        }
    }

    pub async fn apply_semantic(&self, state: &mut ResolutionState, page: &PageContext<'_>) {
        let Some(extractor) = self.semantic else {
            return;
        };
        let wanted = state.unresolved();
        if wanted.is_empty() {
            return;
        }

        let mut sources: Vec<&str> = page.texts.clone();
        if let Some(price_text) = page.price_text {
            if !sources.contains(&price_text) {
                sources.push(price_text);
            }
        }
        let text = sources.join("\n\n");
        if text.trim().is_empty() {
            debug!("No page text for {}, skipping semantic extraction", page.product_name);
            return;
        }

        let manifest: FieldManifest = wanted
            .iter()
            .map(|field| (field.key().to_string(), field.instruction(self.currency)))
            .collect();

        match extractor.extract(&text, &manifest).await {
            Ok(answers) => {
                let mut filled = 0;
                for field in wanted {
                    let value = answers
                        .get(field.key())
                        .and_then(|raw| coerce_answer(field, raw, self.currency));
                    if let Some(value) = value {
                        if state.fill(field, value, Tier::Semantic) {
                            filled += 1;
                        }
                    }
                }
                info!("Semantic extraction filled {} fields for {}", filled, page.product_name);
            }
            Err(e) => {
                warn!("Semantic extraction failed for {}: {}", page.product_name, e);
            }
        }
    }
}

/// Raw-text version of the grid micro-parsers. Price is resolved by [`PriceRule`] instead.
pub fn parse_text_field(field: Field, text: &str) -> Option<FieldValue> {
    match field {
        Field::Chip => parse_chip(text).map(FieldValue::Text),
        Field::RamGb => parse_ram_text(text).map(FieldValue::Number),
        Field::StorageGb => parse_storage_text(text).base_gb.map(FieldValue::Number),
        Field::StorageTb => parse_storage_text(text).top_tb.map(FieldValue::Number),
        Field::BatteryHours => parse_battery_hours(text).map(FieldValue::Number),
        Field::WeightKg => parse_weight_kg(text).map(FieldValue::Number),
        Field::Ports => parse_ports(text).map(FieldValue::Text),
        Field::DisplayInches => parse_display_inches(text).map(FieldValue::Number),
        Field::Price => None,
    }
}

/// Best-effort conversion of one semantic answer into a typed value.
pub fn coerce_answer(field: Field, raw: &Value, currency: Currency) -> Option<FieldValue> {
    if field.is_text() {
        let text = clean_text(raw.as_str()?);
        return (!text.is_empty()).then_some(FieldValue::Text(text));
    }

    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.replace(',', "");
            ANSWER_NUMBER_REGEX.find(&s)?.as_str().parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !number.is_finite() || number <= 0.0 {
        return None;
    }

    Some(match field {
        Field::Price => FieldValue::Price(Price::new(number, currency)),
        _ => FieldValue::Number(number),
    })
}
