use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{page_from_html, CaptureFilter, CapturedPayload, FetchedPage, PageSource};
use crate::error::SourceError;

/// Reads saved pages from a directory instead of the network.
///
/// A URL maps to a file stem (scheme dropped, every other non-alphanumeric run folded to `_`).
/// `<stem>.html` or `<stem>.txt` supplies the text and `<stem>.json` a captured payload.
pub struct FixturePageSource {
    root: PathBuf,
    filter: CaptureFilter,
}

impl FixturePageSource {
    pub fn new(root: impl Into<PathBuf>, filter: CaptureFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }
}

pub fn fixture_stem(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let mut stem = String::with_capacity(without_scheme.len());
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    stem.trim_matches('_').to_string()
}

async fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PageSource for FixturePageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, SourceError> {
        let stem = fixture_stem(url);
        let html = read_optional(&self.root.join(format!("{}.html", stem))).await?;
        let text = read_optional(&self.root.join(format!("{}.txt", stem))).await?;
        let json = read_optional(&self.root.join(format!("{}.json", stem))).await?;

        if html.is_none() && text.is_none() && json.is_none() {
            return Err(SourceError::NotFound(format!("{} (no fixture {}.*)", url, stem)));
        }
        debug!("Serving {} from fixture {}", url, stem);

        let mut page = match (html, text) {
            (Some(html), _) => page_from_html(url, &html, &self.filter),
            (None, Some(text)) => FetchedPage {
                url: url.to_string(),
                text: crate::parsers::clean_text(&text),
                payloads: Vec::new(),
            },
            (None, None) => FetchedPage {
                url: url.to_string(),
                ..FetchedPage::default()
            },
        };

        if let Some(json) = json {
            let body: Value = serde_json::from_str(&json)?;
            page.payloads.insert(0, CapturedPayload { url: url.to_string(), body });
        }

        Ok(page)
    }

    fn name(&self) -> &'static str {
        "fixtures"
    }
}
