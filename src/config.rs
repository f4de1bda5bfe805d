use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::models::{Category, Currency, Field, FieldValue, FieldValues};
use crate::parsers::{PriceDisambiguator, PriceRule};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub region: String,
    pub out_dir: PathBuf,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    #[serde(default)]
    pub capture_keywords: Vec<String>,
    #[serde(default)]
    pub fixtures_dir: Option<PathBuf>,
    pub semantic: SemanticConfig,
    pub lineups: Vec<LineupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    pub enabled: bool,
    pub api_base: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_chars: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupConfig {
    pub key: String,
    pub category: Category,
    pub file_stem: String,
    pub compare_url: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub defaults: FieldDefaults,
    #[serde(default)]
    pub families: Vec<FamilyConfig>,
    /// Catalog used when the compare page yields no grid.
    #[serde(default)]
    pub models: Vec<CatalogModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub key: String,
    /// Lowercase phrases matched against product names. Empty matches anything.
    #[serde(default)]
    pub match_any: Vec<String>,
    #[serde(default)]
    pub buy_url: Option<String>,
    #[serde(default)]
    pub marketing_url: Option<String>,
    #[serde(default)]
    pub size_threshold: Option<f64>,
    #[serde(default)]
    pub variant_keyword: Option<String>,
    #[serde(default)]
    pub defaults: FieldDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogModel {
    pub name: String,
    pub family: String,
    #[serde(default)]
    pub display_inches: Option<f64>,
}

/// Values used when no tier found anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefaults {
    #[serde(default)]
    pub chip: Option<String>,
    #[serde(default)]
    pub ram_gb: Option<f64>,
    #[serde(default)]
    pub storage_gb: Option<f64>,
    #[serde(default)]
    pub storage_tb: Option<f64>,
    #[serde(default)]
    pub battery_hours: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default)]
    pub display_inches: Option<f64>,
}

impl Config {
    /// Built-in defaults, then `path` (if any), then `LINEUP_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("LINEUP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.currency()?;

        if self.lineups.is_empty() {
            bail!("No lineups configured");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }

        for lineup in &self.lineups {
            region_url(&lineup.compare_url, &self.region)
                .with_context(|| format!("Lineup {} has an invalid compare_url", lineup.key))?;

            for family in &lineup.families {
                for template in family.buy_url.iter().chain(family.marketing_url.iter()) {
                    region_url(template, &self.region)
                        .with_context(|| format!("Family {} has an invalid URL", family.key))?;
                }
                if family.size_threshold.is_some() && family.variant_keyword.is_some() {
                    bail!("Family {} sets both size_threshold and variant_keyword", family.key);
                }
            }

            for model in &lineup.models {
                if lineup.family(&model.family).is_none() {
                    bail!("Catalog model {} names unknown family {}", model.name, model.family);
                }
            }
        }

        Ok(())
    }

    pub fn currency(&self) -> Result<Currency> {
        Currency::for_region(&self.region)
            .with_context(|| format!("Unsupported region: {}", self.region))
    }

    pub fn lineup(&self, key: &str) -> Option<&LineupConfig> {
        self.lineups.iter().find(|lineup| lineup.key.eq_ignore_ascii_case(key))
    }
}

impl LineupConfig {
    /// Lineup note with `{region}` replaced by the storefront code ("IN", "UK").
    pub fn note_for(&self, region: &str) -> Option<String> {
        self.note
            .as_ref()
            .map(|note| note.replace("{region}", &region.to_uppercase()))
    }

    pub fn family(&self, key: &str) -> Option<&FamilyConfig> {
        self.families.iter().find(|family| family.key == key)
    }

    /// First family with a phrase contained in `product_name`, else the first catch-all family.
    pub fn family_for(&self, product_name: &str) -> Option<&FamilyConfig> {
        let name = product_name.to_lowercase();
        self.families
            .iter()
            .find(|family| family.match_any.iter().any(|phrase| name.contains(&phrase.to_lowercase())))
            .or_else(|| self.families.iter().find(|family| family.match_any.is_empty()))
    }
}

impl FamilyConfig {
    pub fn price_rule(&self) -> PriceRule {
        if let Some(threshold) = self.size_threshold {
            PriceRule::SizeThreshold(PriceDisambiguator::new(threshold))
        } else if let Some(keyword) = &self.variant_keyword {
            PriceRule::VariantKeyword(keyword.clone())
        } else {
            PriceRule::FromPrice
        }
    }
}

impl FieldDefaults {
    pub fn to_field_values(&self) -> FieldValues {
        let mut values = FieldValues::new();

        let texts = [(Field::Chip, &self.chip), (Field::Ports, &self.ports)];
        for (field, value) in texts {
            if let Some(text) = value {
                values.set_if_empty(field, FieldValue::Text(text.clone()));
            }
        }

        let numbers = [
            (Field::RamGb, self.ram_gb),
            (Field::StorageGb, self.storage_gb),
            (Field::StorageTb, self.storage_tb),
            (Field::BatteryHours, self.battery_hours),
            (Field::WeightKg, self.weight_kg),
            (Field::DisplayInches, self.display_inches),
        ];
        for (field, value) in numbers {
            if let Some(number) = value {
                values.set_if_empty(field, FieldValue::Number(number));
            }
        }

        values
    }
}

/// Expands `{region}` in a URL template. The US storefront has no region path segment.
pub fn region_url(template: &str, region: &str) -> Result<Url> {
    let region = region.to_lowercase();
    let expanded = if region == "us" {
        template.replace("/{region}", "")
    } else {
        template.replace("{region}", &region)
    };

    Url::parse(&expanded).with_context(|| format!("Invalid URL: {}", expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defaults() -> Config {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .unwrap();
        settings.try_deserialize().unwrap()
    }

    #[test]
    fn built_in_defaults_are_valid() {
        let config = defaults();
        config.validate().unwrap();

        assert_eq!(config.currency().unwrap(), Currency::Inr);
        assert_eq!(config.semantic.max_chars, 180000);
        assert_eq!(config.lineups.len(), 2);

        let ipad = config.lineup("IPAD").unwrap();
        assert_eq!(ipad.category, Category::Ipad);
        assert_eq!(ipad.models.len(), 6);
        assert_eq!(ipad.defaults.battery_hours, Some(10.0));
    }

    #[test]
    fn families_match_full_phrases() {
        let config = defaults();
        let ipad = config.lineup("ipad").unwrap();

        let family = |name: &str| ipad.family_for(name).map(|f| f.key.as_str());
        assert_eq!(family("iPad Pro 13″ (M4)"), Some("ipad-pro"));
        assert_eq!(family("iPad mini (A17 Pro)"), Some("ipad-mini"));
        assert_eq!(family("iPad Air 11″"), Some("ipad-air"));
        assert_eq!(family("iPad (A16)"), Some("ipad"));

        let mac = config.lineup("mac").unwrap();
        assert_eq!(mac.family_for("MacBook Pro 14″").map(|f| f.key.as_str()), Some("macbook-pro"));
        assert_eq!(mac.family_for("Mac Pro").map(|f| f.key.as_str()), Some("mac-pro"));
        assert!(mac.family_for("Studio Display").is_none());
    }

    #[test]
    fn families_carry_price_rules() {
        let config = defaults();
        let ipad = config.lineup("ipad").unwrap();
        let mac = config.lineup("mac").unwrap();

        assert_eq!(
            ipad.family("ipad-air").unwrap().price_rule(),
            PriceRule::SizeThreshold(PriceDisambiguator::new(12.8))
        );
        assert_eq!(ipad.family("ipad-mini").unwrap().price_rule(), PriceRule::FromPrice);
        assert_eq!(mac.family("imac").unwrap().price_rule(), PriceRule::VariantKeyword("two".into()));
    }

    #[test]
    fn region_urls() {
        let template = "https://www.apple.com/{region}/shop/buy-ipad/ipad-air";
        assert_eq!(
            region_url(template, "IN").unwrap().as_str(),
            "https://www.apple.com/in/shop/buy-ipad/ipad-air"
        );
        assert_eq!(
            region_url(template, "US").unwrap().as_str(),
            "https://www.apple.com/shop/buy-ipad/ipad-air"
        );
        assert!(region_url("not a url/{region}", "IN").is_err());
    }

    #[test]
    fn lineup_note_names_the_region() {
        let config = defaults();
        let ipad = config.lineup("ipad").unwrap();

        assert_eq!(ipad.note_for("uk").as_deref(), Some("UK 'From' price; Wi-Fi model weight."));
        assert_eq!(ipad.note_for("IN").as_deref(), Some("IN 'From' price; Wi-Fi model weight."));
        assert_eq!(config.lineup("mac").unwrap().note_for("IN"), None);
    }

    #[test]
    fn defaults_become_field_values() {
        let defaults = FieldDefaults {
            battery_hours: Some(10.0),
            ports: Some("USB-C".into()),
            ..FieldDefaults::default()
        };
        let values = defaults.to_field_values();

        assert_eq!(values.len(), 2);
        assert_eq!(values.get(Field::BatteryHours), Some(&FieldValue::Number(10.0)));
        assert_eq!(values.get(Field::Ports), Some(&FieldValue::Text("USB-C".into())));
    }

    #[test]
    fn unsupported_region_is_rejected() {
        let mut config = defaults();
        config.region = "JP".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn user_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("lineup-specs-config-{}.toml", std::process::id()));
        std::fs::write(&path, "region = \"UK\"\ntimeout_secs = 15\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.region, "UK");
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.currency().unwrap(), Currency::Gbp);
        assert_eq!(config.lineups.len(), 2);

        let _ = std::fs::remove_file(&path);
    }
}
