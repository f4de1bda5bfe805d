//! Drives one configured lineup: compare page, family pages, resolution, assembly.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::config::{region_url, FamilyConfig, LineupConfig};
use crate::error::SourceError;
use crate::extract::{FallbackChain, FieldExtractor, PageContext, RecordAssembler, RecordContext};
use crate::models::{ColumnSet, Currency, Field, FieldValue, FieldValues, Grid, ProductRecord};
use crate::parsers::{resolve_column_names, PriceRule, ShapeRegistry};
use crate::semantic::SemanticExtractor;
use crate::sources::{CapturedPayload, FetchedPage, PageCache};

/// Grid and names chosen from a page's payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareSelection {
    pub payload_url: String,
    pub grid: Grid,
    pub columns: ColumnSet,
}

/// First payload with a non-empty grid and resolvable names; otherwise the first non-empty grid
/// with placeholder names.
pub fn select_payload(payloads: &[CapturedPayload], registry: &ShapeRegistry) -> Option<CompareSelection> {
    let mut fallback: Option<CompareSelection> = None;

    for payload in payloads {
        let grid = registry.normalize(&payload.body);
        if grid.is_empty() {
            continue;
        }

        let names = resolve_column_names(&payload.body);
        if !names.is_empty() {
            let columns = ColumnSet::from_names(names, &grid);
            return Some(CompareSelection {
                payload_url: payload.url.clone(),
                grid,
                columns,
            });
        }

        if fallback.is_none() {
            let columns = ColumnSet::from_names(Vec::new(), &grid);
            fallback = Some(CompareSelection {
                payload_url: payload.url.clone(),
                grid,
                columns,
            });
        }
    }

    fallback
}

/// A product to resolve: its name and whatever the structured tier found.
#[derive(Debug, Clone)]
struct Seed {
    name: String,
    values: FieldValues,
}

pub struct LineupScraper<'a> {
    lineup: &'a LineupConfig,
    region: &'a str,
    currency: Currency,
    registry: &'a ShapeRegistry,
    semantic: Option<&'a dyn SemanticExtractor>,
}

impl<'a> LineupScraper<'a> {
    pub fn new(
        lineup: &'a LineupConfig,
        region: &'a str,
        currency: Currency,
        registry: &'a ShapeRegistry,
        semantic: Option<&'a dyn SemanticExtractor>,
    ) -> Self {
        Self {
            lineup,
            region,
            currency,
            registry,
            semantic,
        }
    }

    pub async fn scrape(&self, cache: &mut PageCache<'_>) -> Result<Vec<ProductRecord>> {
        info!("Processing lineup: {}", self.lineup.key.to_uppercase());

        let seeds = self.seeds(cache).await?;
        if seeds.is_empty() {
            warn!("No products found for lineup {}", self.lineup.key);
            return Ok(Vec::new());
        }

        let chain = FallbackChain::new(self.currency).with_semantic(self.semantic);
        let assembler = RecordAssembler::new(self.currency);
        let lineup_defaults = self.lineup.defaults.to_field_values();
        let note = self.lineup.note_for(self.region);

        let mut records = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let family = self.lineup.family_for(&seed.name);
            let pages = match family {
                Some(family) => self.family_pages(cache, family).await?,
                None => {
                    warn!("No family configured for {}", seed.name);
                    FamilyPages::default()
                }
            };

            let page = pages.context(&seed.name, family);
            let state = chain.resolve(seed.values, &page).await;

            let family_defaults = family.map(|f| f.defaults.to_field_values()).unwrap_or_default();
            let context = RecordContext {
                name: &seed.name,
                category: self.lineup.category,
                url: pages.url.as_ref().map(Url::as_str),
                note: note.as_deref(),
                defaults: vec![&family_defaults, &lineup_defaults],
            };
            records.push(assembler.assemble(&context, state));
        }

        info!("Resolved {} records for lineup {}", records.len(), self.lineup.key);
        Ok(records)
    }

    async fn seeds(&self, cache: &mut PageCache<'_>) -> Result<Vec<Seed>> {
        let compare_url = region_url(&self.lineup.compare_url, self.region)?;

        let selection = match cache.get(compare_url.as_str()).await {
            Ok(page) => select_payload(&page.payloads, self.registry),
            Err(e) => {
                warn!("Compare page for {} unavailable: {}", self.lineup.key, e);
                None
            }
        };

        if let Some(selection) = selection {
            info!(
                "Using compare payload {} ({} rows, {} columns)",
                selection.payload_url,
                selection.grid.len(),
                selection.columns.len()
            );
            let extractor = FieldExtractor::for_category(self.lineup.category);
            return Ok(extractor
                .extract(&selection.grid, &selection.columns)
                .into_iter()
                .map(|column| Seed {
                    name: column.name,
                    values: column.values,
                })
                .collect());
        }

        info!("No compare grid for {}, using {} catalog models", self.lineup.key, self.lineup.models.len());
        Ok(self
            .lineup
            .models
            .iter()
            .map(|model| {
                let mut values = FieldValues::new();
                if let Some(inches) = model.display_inches {
                    values.set_if_empty(Field::DisplayInches, FieldValue::Number(inches));
                }
                Seed {
                    name: model.name.clone(),
                    values,
                }
            })
            .collect())
    }

    async fn family_pages(&self, cache: &mut PageCache<'_>, family: &FamilyConfig) -> Result<FamilyPages> {
        let mut pages = FamilyPages::default();

        if let Some(template) = &family.marketing_url {
            let url = region_url(template, self.region)?;
            pages.marketing = self.fetch_family_page(cache, &url, family).await;
            pages.url = Some(url);
        }
        if let Some(template) = &family.buy_url {
            let url = region_url(template, self.region)?;
            pages.buy = self.fetch_family_page(cache, &url, family).await;
            if pages.url.is_none() {
                pages.url = Some(url);
            }
        }

        Ok(pages)
    }

    /// Failures are reported once per URL and never abort the lineup.
    async fn fetch_family_page(
        &self,
        cache: &mut PageCache<'_>,
        url: &Url,
        family: &FamilyConfig,
    ) -> Option<Arc<FetchedPage>> {
        match cache.get(url.as_str()).await {
            Ok(page) => Some(page),
            Err(SourceError::PreviouslyFailed(_)) => None,
            Err(e) => {
                let report = format!("Fetching {} for family {} failed: {}", url, family.key, e);
                let summary = match self.semantic {
                    Some(extractor) => extractor.explain_failure(&report).await,
                    None => report,
                };
                warn!("{}", summary);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct FamilyPages {
    url: Option<Url>,
    marketing: Option<Arc<FetchedPage>>,
    buy: Option<Arc<FetchedPage>>,
}

impl FamilyPages {
    fn context<'p>(&'p self, product_name: &'p str, family: Option<&FamilyConfig>) -> PageContext<'p> {
        let texts = [&self.marketing, &self.buy]
            .into_iter()
            .flatten()
            .map(|page| page.text.as_str())
            .filter(|text| !text.is_empty())
            .collect();

        PageContext {
            product_name,
            texts,
            price_text: self.buy.as_ref().map(|page| page.text.as_str()),
            price_rule: family.map(FamilyConfig::price_rule).unwrap_or(PriceRule::FromPrice),
        }
    }
}
