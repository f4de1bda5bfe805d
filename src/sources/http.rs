use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{page_from_html, CaptureFilter, CapturedPayload, FetchedPage, PageSource};
use crate::error::SourceError;
use crate::utils::http::fetch_with_retry;

/// Fetches pages over plain HTTP; no script execution.
pub struct HttpPageSource {
    client: Client,
    filter: CaptureFilter,
    max_retries: u32,
}

impl HttpPageSource {
    pub fn new(client: Client, filter: CaptureFilter, max_retries: u32) -> Self {
        Self {
            client,
            filter,
            max_retries,
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, SourceError> {
        let response = fetch_with_retry(&self.client, url, self.max_retries).await?;
        let final_url = response.url().to_string();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("json"))
            .unwrap_or(false);
        let body = response.text().await?;

        if is_json {
            let mut page = FetchedPage {
                url: final_url.clone(),
                ..FetchedPage::default()
            };
            if self.filter.matches(&final_url) {
                let body: Value = serde_json::from_str(&body)?;
                page.payloads.push(CapturedPayload { url: final_url, body });
            } else {
                debug!("Ignoring JSON response {}", final_url);
            }
            return Ok(page);
        }

        Ok(page_from_html(&final_url, &body, &self.filter))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source() -> HttpPageSource {
        let filter = CaptureFilter::new(&["compare".to_string(), "spec".to_string()]);
        HttpPageSource::new(Client::new(), filter, 1)
    }

    #[tokio::test]
    async fn json_responses_become_payloads() {
        let server = MockServer::start().await;
        let payload = json!({"sections": [{"rows": [{"label": "Chip", "cells": ["M4"]}]}]});
        Mock::given(method("GET"))
            .and(path("/in/ipad/compare/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .mount(&server)
            .await;

        let url = format!("{}/in/ipad/compare/data.json", server.uri());
        let page = source().fetch(&url).await.unwrap();

        assert_eq!(page.text, "");
        assert_eq!(page.payloads, vec![CapturedPayload { url, body: payload }]);
    }

    #[tokio::test]
    async fn json_outside_capture_keywords_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
            .mount(&server)
            .await;

        let page = source().fetch(&format!("{}/metrics/beacon", server.uri())).await.unwrap();
        assert!(page.payloads.is_empty());
    }

    #[tokio::test]
    async fn html_pages_are_rendered_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/in/ipad-air/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><script>var x = 1;</script><p>462 grams</p></body></html>"),
            )
            .mount(&server)
            .await;

        let page = source().fetch(&format!("{}/in/ipad-air/", server.uri())).await.unwrap();
        assert_eq!(page.text, "462 grams");
        assert!(page.payloads.is_empty());
    }

    #[tokio::test]
    async fn missing_pages_surface_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = source().fetch(&format!("{}/in/ipad-pro/", server.uri())).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
