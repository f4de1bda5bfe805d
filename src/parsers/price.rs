use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Currency, Price, PriceTokens, PriceVariant};

static AMOUNT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([₹$€£])\s?(\d+(?:\.\d+)?)")
        .expect("Invalid price regex")
});

static FROM_PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:from|starting at)\s*([₹$€£])\s?(\d{2,7}(?:\.\d{1,2})?)")
        .expect("Invalid from-price regex")
});

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Z0-9_]+)\}\*?")
        .expect("Invalid price token regex")
});

/// Characters before a token searched for variant keywords.
const TOKEN_WINDOW: usize = 40;

/// Thousands separators are dropped before matching ("₹1,29,900" → 129900).
fn strip_separators(text: &str) -> String {
    text.replace(',', "")
}

/// First currency symbol + amount in `text`, in whatever currency it is quoted.
pub fn parse_currency_amount(text: &str) -> Option<Price> {
    let text = strip_separators(text);
    AMOUNT_REGEX.captures_iter(&text).find_map(|caps| {
        let currency = caps[1].chars().next().and_then(Currency::from_symbol)?;
        let amount = caps[2].parse::<f64>().ok()?;
        Some(Price::new(amount, currency))
    })
}

/// Every distinct amount quoted in `currency`, ascending.
pub fn currency_amounts(text: &str, currency: Currency) -> Vec<f64> {
    let text = strip_separators(text);
    let mut amounts: Vec<f64> = AMOUNT_REGEX
        .captures_iter(&text)
        .filter(|caps| caps[1].starts_with(currency.symbol()))
        .filter_map(|caps| caps[2].parse::<f64>().ok())
        .collect();

    amounts.sort_by(f64::total_cmp);
    amounts.dedup();
    amounts
}

/// "From ₹59,900" / "Starting at $599" on a buy page; falls back to the first amount in
/// `currency` anywhere on the page.
pub fn parse_from_price(text: &str, currency: Currency) -> Option<f64> {
    let stripped = strip_separators(text);
    let near = FROM_PRICE_REGEX
        .captures_iter(&stripped)
        .find(|caps| caps[1].starts_with(currency.symbol()))
        .and_then(|caps| caps[2].parse::<f64>().ok());

    near.or_else(|| currency_amounts_in_order(&stripped, currency).into_iter().next())
}

fn currency_amounts_in_order(stripped: &str, currency: Currency) -> Vec<f64> {
    AMOUNT_REGEX
        .captures_iter(stripped)
        .filter(|caps| caps[1].starts_with(currency.symbol()))
        .filter_map(|caps| caps[2].parse::<f64>().ok())
        .collect()
}

/// Placeholder tokens such as `{PRICE_WIFI_11}*`, tagged by variant.
///
/// A token is a cellular price when the text just before it (at most 40 characters, never
/// reaching back past the previous token) mentions "cellular"; otherwise it is the Wi-Fi price.
/// The first token of each variant wins.
pub fn extract_price_tokens(text: &str) -> PriceTokens {
    let mut tokens = PriceTokens::new();
    let mut previous_end = 0;

    for caps in TOKEN_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let mut window_start = whole.start().saturating_sub(TOKEN_WINDOW).max(previous_end);
        while !text.is_char_boundary(window_start) {
            window_start += 1;
        }
        let window = text[window_start..whole.start()].to_lowercase();

        let variant = if window.contains("cellular") {
            PriceVariant::Cellular
        } else {
            PriceVariant::Wifi
        };
        tokens.entry(variant).or_insert_with(|| caps[1].to_string());
        previous_end = whole.end();
    }

    tokens
}

/// Picks one price when a buy page lists several sizes under one "From" block.
///
/// Records at or above `threshold_inches` take the highest amount on the page, smaller (or
/// unknown) sizes the lowest. Two variants of the same size cannot be told apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDisambiguator {
    pub threshold_inches: f64,
}

impl PriceDisambiguator {
    pub fn new(threshold_inches: f64) -> Self {
        Self { threshold_inches }
    }

    pub fn pick(&self, amounts: &[f64], display_inches: Option<f64>) -> Option<f64> {
        let min = amounts.iter().copied().reduce(f64::min)?;
        let max = amounts.iter().copied().reduce(f64::max)?;
        match display_inches {
            Some(size) if size >= self.threshold_inches => Some(max),
            _ => Some(min),
        }
    }

    pub fn resolve(&self, text: &str, currency: Currency, display_inches: Option<f64>) -> Option<f64> {
        self.pick(&currency_amounts(text, currency), display_inches)
    }
}

/// How a family's buy page price is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceRule {
    /// First "From"/"Starting at" amount.
    FromPrice,
    /// Several display sizes share the page; see [`PriceDisambiguator`].
    SizeThreshold(PriceDisambiguator),
    /// Lowest amount when the product name contains the keyword, highest otherwise.
    VariantKeyword(String),
}

impl PriceRule {
    pub fn resolve(
        &self,
        text: &str,
        currency: Currency,
        product_name: &str,
        display_inches: Option<f64>,
    ) -> Option<f64> {
        match self {
            PriceRule::FromPrice => parse_from_price(text, currency),
            PriceRule::SizeThreshold(disambiguator) => disambiguator
                .resolve(text, currency, display_inches)
                .or_else(|| parse_from_price(text, currency)),
            PriceRule::VariantKeyword(keyword) => {
                let amounts = currency_amounts(text, currency);
                if product_name.to_lowercase().contains(&keyword.to_lowercase()) {
                    amounts.first().copied()
                } else {
                    amounts.last().copied()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRO_BUY_PAGE: &str =
        "Buy iPad Pro 11-inch From ₹99,900 13-inch From ₹1,29,900 Trade in and get ₹99,900 off";

    #[test]
    fn currency_amount_with_separators() {
        assert_eq!(parse_currency_amount("From ₹1,29,900*"), Some(Price::new(129900.0, Currency::Inr)));
        assert_eq!(parse_currency_amount("Starting at $ 999"), Some(Price::new(999.0, Currency::Usd)));
        assert_eq!(parse_currency_amount("{PRICE_WIFI}*"), None);
    }

    #[test]
    fn amounts_are_distinct_and_sorted() {
        assert_eq!(currency_amounts(PRO_BUY_PAGE, Currency::Inr), vec![99900.0, 129900.0]);
        assert!(currency_amounts(PRO_BUY_PAGE, Currency::Usd).is_empty());
    }

    #[test]
    fn disambiguator_uses_size_threshold() {
        let disambiguator = PriceDisambiguator::new(12.8);
        let amounts = [89900.0, 109900.0];

        assert_eq!(disambiguator.pick(&amounts, Some(13.0)), Some(109900.0));
        assert_eq!(disambiguator.pick(&amounts, Some(12.8)), Some(109900.0));
        assert_eq!(disambiguator.pick(&amounts, Some(11.0)), Some(89900.0));
        assert_eq!(disambiguator.pick(&amounts, None), Some(89900.0));
        assert_eq!(disambiguator.pick(&[], Some(13.0)), None);
    }

    #[test]
    fn disambiguator_reads_page_text() {
        let disambiguator = PriceDisambiguator::new(12.8);
        assert_eq!(disambiguator.resolve(PRO_BUY_PAGE, Currency::Inr, Some(13.0)), Some(129900.0));
        assert_eq!(disambiguator.resolve(PRO_BUY_PAGE, Currency::Inr, Some(11.1)), Some(99900.0));
    }

    #[test]
    fn from_price_prefers_from_phrase() {
        let text = "Get ₹4,000 back. iPad mini From ₹49,900 or ₹4,158/mo.";
        assert_eq!(parse_from_price(text, Currency::Inr), Some(49900.0));
        assert_eq!(parse_from_price("Only ₹34,900 today", Currency::Inr), Some(34900.0));
        assert_eq!(parse_from_price("From $599", Currency::Inr), None);
    }

    #[test]
    fn tokens_are_tagged_by_preceding_text() {
        let tokens = extract_price_tokens("Wi-Fi {A}* Wi-Fi + Cellular {B}*");
        assert_eq!(tokens.get(&PriceVariant::Wifi).map(String::as_str), Some("A"));
        assert_eq!(tokens.get(&PriceVariant::Cellular).map(String::as_str), Some("B"));

        let reversed = extract_price_tokens("Wi-Fi + Cellular {PRICE_5G} Wi-Fi {PRICE_WIFI}");
        assert_eq!(reversed.get(&PriceVariant::Cellular).map(String::as_str), Some("PRICE_5G"));
        assert_eq!(reversed.get(&PriceVariant::Wifi).map(String::as_str), Some("PRICE_WIFI"));

        assert!(extract_price_tokens("₹59,900").is_empty());
    }

    #[test]
    fn variant_keyword_rule() {
        let text = "iMac From ₹1,34,900 From ₹1,54,900";
        let rule = PriceRule::VariantKeyword("two".into());

        assert_eq!(rule.resolve(text, Currency::Inr, "iMac (two ports)", None), Some(134900.0));
        assert_eq!(rule.resolve(text, Currency::Inr, "iMac (four ports)", None), Some(154900.0));
    }
}
