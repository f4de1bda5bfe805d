use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Inr, Currency::Usd, Currency::Eur, Currency::Gbp];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Currency::Inr => '₹',
            Currency::Usd => '$',
            Currency::Eur => '€',
            Currency::Gbp => '£',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.symbol() == symbol)
    }

    /// Storefront region code (e.g. "IN", "uk") to the currency its prices are quoted in.
    pub fn for_region(region: &str) -> Option<Self> {
        match region.to_uppercase().as_str() {
            "IN" => Some(Currency::Inr),
            "US" => Some(Currency::Usd),
            "UK" | "GB" => Some(Currency::Gbp),
            "DE" | "FR" | "EU" => Some(Currency::Eur),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: Currency,
}

impl Price {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency.symbol(), self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ipad,
    Mac,
    Macbook,
}

impl Category {
    pub fn key(&self) -> &'static str {
        match self {
            Category::Ipad => "ipad",
            Category::Mac => "mac",
            Category::Macbook => "macbook",
        }
    }

    /// Mac lineups mix notebooks and desktops; notebooks get their own category.
    pub fn refine(self, product_name: &str) -> Self {
        match self {
            Category::Mac if product_name.to_lowercase().contains("macbook") => Category::Macbook,
            other => other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Column names preceding the currency-qualified price column.
const LEADING_COLUMNS: [&str; 9] = [
    "name",
    "category",
    "url",
    "chip",
    "ram_gb",
    "storage_gb",
    "storage_tb",
    "battery_hours",
    "weight_kg",
];

const TRAILING_COLUMNS: [&str; 3] = ["ports", "display_inches", "notes"];

/// Derived columns reserved for downstream scoring; always present in output.
const DERIVED_COLUMNS: [&str; 3] = [
    "learning_hours",
    "maintenance_hours_per_year",
    "power_adequacy_score",
];

/// The literal output header, in order. The price column is named after the output currency.
pub fn columns(currency: Currency) -> Vec<String> {
    let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push(format!("price_{}", currency.code().to_lowercase()));
    columns.extend(TRAILING_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
    columns
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub name: String,
    pub category: Category,
    pub url: Option<String>,
    pub chip: Option<String>,
    pub ram_gb: Option<f64>,
    pub storage_gb: Option<f64>,
    pub storage_tb: Option<f64>,
    pub battery_hours: Option<f64>,
    pub weight_kg: Option<f64>,
    pub price: Option<Price>,
    pub ports: Option<String>,
    pub display_inches: Option<f64>,
    pub notes: Option<String>,
    pub learning_hours: Option<f64>,
    pub maintenance_hours_per_year: Option<f64>,
    pub power_adequacy_score: Option<f64>,
}

impl ProductRecord {
    pub fn empty(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            url: None,
            chip: None,
            ram_gb: None,
            storage_gb: None,
            storage_tb: None,
            battery_hours: None,
            weight_kg: None,
            price: None,
            ports: None,
            display_inches: None,
            notes: None,
            learning_hours: None,
            maintenance_hours_per_year: None,
            power_adequacy_score: None,
        }
    }

    /// One cell per entry of [`columns`]; nulls become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.category.key().to_string(),
            text_cell(&self.url),
            text_cell(&self.chip),
            number_cell(self.ram_gb),
            number_cell(self.storage_gb),
            number_cell(self.storage_tb),
            number_cell(self.battery_hours),
            number_cell(self.weight_kg),
            number_cell(self.price.map(|p| p.amount)),
            text_cell(&self.ports),
            number_cell(self.display_inches),
            text_cell(&self.notes),
            number_cell(self.learning_hours),
            number_cell(self.maintenance_hours_per_year),
            number_cell(self.power_adequacy_score),
        ]
    }
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.1}", v),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_record_still_fills_every_column() {
        let record = ProductRecord::empty("Model 1", Category::Ipad);
        let row = record.to_row();

        assert_eq!(row.len(), columns(Currency::Inr).len());
        assert_eq!(row[0], "Model 1");
        assert_eq!(row[1], "ipad");
        assert!(row[2..].iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn price_column_is_named_after_currency() {
        let header = columns(Currency::Gbp);
        assert_eq!(header[9], "price_gbp");
        assert_eq!(header.last().map(String::as_str), Some("power_adequacy_score"));
    }

    #[test]
    fn numbers_render_with_decimal_point() {
        let mut record = ProductRecord::empty("iPad Air", Category::Ipad);
        record.battery_hours = Some(10.0);
        record.weight_kg = Some(0.444);
        record.price = Some(Price::new(59900.0, Currency::Inr));

        let row = record.to_row();
        assert_eq!(row[7], "10.0");
        assert_eq!(row[8], "0.444");
        assert_eq!(row[9], "59900.0");
    }

    #[test]
    fn mac_category_refines_notebooks() {
        assert_eq!(Category::Mac.refine("MacBook Air 13″"), Category::Macbook);
        assert_eq!(Category::Mac.refine("Mac mini"), Category::Mac);
        assert_eq!(Category::Ipad.refine("MacBook"), Category::Ipad);
    }

    #[test]
    fn region_maps_to_currency() {
        assert_eq!(Currency::for_region("in"), Some(Currency::Inr));
        assert_eq!(Currency::for_region("GB"), Some(Currency::Gbp));
        assert_eq!(Currency::for_region("JP"), None);
        assert_eq!(Currency::from_symbol('€'), Some(Currency::Eur));
    }
}
