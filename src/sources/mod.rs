//! Page retrieval: rendered text plus the JSON payloads a page exposes.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::parsers::page_text;

mod fixture;
mod http;

pub use fixture::FixturePageSource;
pub use http::HttpPageSource;

static JSON_SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/json"]"#)
        .expect("Invalid JSON script selector")
});

/// A JSON body captured while loading a page.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPayload {
    pub url: String,
    pub body: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub text: String,
    pub payloads: Vec<CapturedPayload>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, SourceError>;
    fn name(&self) -> &'static str;
}

/// Keeps payloads whose address mentions one of the keywords. No keywords keeps everything.
#[derive(Debug, Clone, Default)]
pub struct CaptureFilter {
    keywords: Vec<String>,
}

impl CaptureFilter {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let url = url.to_lowercase();
        self.keywords.iter().any(|keyword| url.contains(keyword.as_str()))
    }
}

/// Splits an HTML document into visible text and embedded `application/json` scripts.
///
/// Scripts are addressed as `<page url>#<script id>` (or `#script-<n>` without an id).
pub fn page_from_html(url: &str, html: &str, filter: &CaptureFilter) -> FetchedPage {
    let document = Html::parse_document(html);
    let mut payloads = Vec::new();

    for (index, script) in document.select(&JSON_SCRIPT_SELECTOR).enumerate() {
        let address = match script.value().id() {
            Some(id) => format!("{}#{}", url, id),
            None => format!("{}#script-{}", url, index + 1),
        };
        if !filter.matches(&address) {
            continue;
        }
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(&raw) {
            Ok(body) => payloads.push(CapturedPayload { url: address, body }),
            Err(e) => debug!("Skipping unparsable script {}: {}", address, e),
        }
    }

    FetchedPage {
        url: url.to_string(),
        text: page_text(html),
        payloads,
    }
}

/// Per-run page store. Each URL is requested at most once; failures are remembered too.
pub struct PageCache<'a> {
    source: &'a dyn PageSource,
    pages: HashMap<String, Option<Arc<FetchedPage>>>,
    fetched: usize,
}

impl<'a> PageCache<'a> {
    pub fn new(source: &'a dyn PageSource) -> Self {
        Self {
            source,
            pages: HashMap::new(),
            fetched: 0,
        }
    }

    pub async fn get(&mut self, url: &str) -> Result<Arc<FetchedPage>, SourceError> {
        if let Some(entry) = self.pages.get(url) {
            return entry
                .clone()
                .ok_or_else(|| SourceError::PreviouslyFailed(url.to_string()));
        }

        info!("Fetching {} via {}", url, self.source.name());
        match self.source.fetch(url).await {
            Ok(page) => {
                let page = Arc::new(page);
                self.fetched += 1;
                self.pages.insert(url.to_string(), Some(page.clone()));
                Ok(page)
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                self.pages.insert(url.to_string(), None);
                Err(e)
            }
        }
    }

    /// Pages fetched successfully so far.
    pub fn fetched_count(&self) -> usize {
        self.fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("missing") {
                return Err(SourceError::NotFound(url.to_string()));
            }
            Ok(FetchedPage {
                url: url.to_string(),
                text: "iPad".into(),
                payloads: Vec::new(),
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn cache_requests_each_url_once() {
        let source = CountingSource { calls: AtomicUsize::new(0) };
        let mut cache = PageCache::new(&source);

        tokio_test::block_on(async {
            assert_eq!(cache.get("https://a/ipad").await.unwrap().text, "iPad");
            assert_eq!(cache.get("https://a/ipad").await.unwrap().text, "iPad");

            assert!(matches!(cache.get("https://a/missing").await, Err(SourceError::NotFound(_))));
            assert!(matches!(cache.get("https://a/missing").await, Err(SourceError::PreviouslyFailed(_))));
        });

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.fetched_count(), 1);
    }

    #[test]
    fn capture_filter_is_case_insensitive() {
        let filter = CaptureFilter::new(&["compare".to_string(), "grid".to_string()]);
        assert!(filter.matches("https://www.apple.com/in/ipad/Compare/data.json"));
        assert!(!filter.matches("https://www.apple.com/in/ipad/analytics.json"));
        assert!(CaptureFilter::default().matches("anything"));
    }

    #[test]
    fn html_pages_expose_text_and_json_scripts() {
        let html = r#"<html><head>
            <style>body { color: red }</style>
            <script type="application/json" id="compare-data">{"grid": {"rows": []}}</script>
            <script type="application/json" id="analytics">{"page": "ipad"}</script>
            <script type="application/json" id="compare-broken">{not json</script>
        </head><body><h1>iPad&nbsp;Air</h1><p>From ₹59,900</p></body></html>"#;

        let filter = CaptureFilter::new(&["compare".to_string()]);
        let page = page_from_html("https://www.apple.com/in/ipad/compare/", html, &CaptureFilter::new(&[]));
        assert_eq!(page.payloads.len(), 2);

        let page = page_from_html("https://www.apple.com/in/ipad-air/", html, &filter);
        assert_eq!(page.text, "iPad Air From ₹59,900");
        assert_eq!(page.payloads.len(), 1);
        assert_eq!(page.payloads[0].url, "https://www.apple.com/in/ipad-air/#compare-data");
        assert_eq!(page.payloads[0].body["grid"]["rows"], serde_json::json!([]));
    }
}
