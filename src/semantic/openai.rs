use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{FieldManifest, SemanticExtractor};
use crate::config::SemanticConfig;
use crate::error::SemanticError;

const SYSTEM_PROMPT: &str = "You are a precise product-page parser. Extract numeric values and short strings.\n\
    If a field is not present, return null. Use numbers only for prices, weights and sizes. \
    Answer with a single flat JSON object keyed by field name.";

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiExtractor {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    max_chars: usize,
}

impl OpenAiExtractor {
    pub fn new(client: Client, api_base: &str, api_key: &str, model: &str, max_chars: usize) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_chars,
        }
    }

    /// `None` when the tier is switched off or the API key variable is unset.
    pub fn from_config(config: &SemanticConfig, client: Client) -> Option<Self> {
        if !config.enabled {
            info!("Semantic extraction disabled");
            return None;
        }
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(
                client,
                &config.api_base,
                key.trim(),
                &config.model,
                config.max_chars,
            )),
            _ => {
                info!("{} not set, semantic extraction disabled", config.api_key_env);
                None
            }
        }
    }

    async fn complete(&self, messages: Value, temperature: f64, json_mode: bool) -> Result<String, SemanticError> {
        let mut body = json!({
            "model": self.model,
            "temperature": temperature,
            "messages": messages,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SemanticError::Api(status.as_u16(), text));
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SemanticError::MissingContent)
    }
}

#[async_trait]
impl SemanticExtractor for OpenAiExtractor {
    async fn extract(&self, text: &str, manifest: &FieldManifest) -> Result<HashMap<String, Value>, SemanticError> {
        let task = json!({
            "task": "Extract product specification fields from this page text. Return JSON only.",
            "fields": manifest,
        });
        let messages = json!([
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": task.to_string()},
            {"role": "user", "content": truncate_chars(text, self.max_chars)},
        ]);

        debug!("Asking {} for {} fields", self.model, manifest.len());
        let content = self.complete(messages, 0.0, true).await?;

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => {
                warn!("Semantic answer was not an object: {}", other);
                Ok(HashMap::new())
            }
        }
    }

    async fn explain_failure(&self, report: &str) -> String {
        let prompt = format!(
            "Summarize this scraping error in one paragraph with a short list of likely fixes. \
             Keep it concise and actionable:\n\n{}",
            report
        );
        let messages = json!([{"role": "user", "content": prompt}]);

        match self.complete(messages, 0.2, false).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                warn!("Could not explain failure: {}", e);
                report.to_string()
            }
        }
    }
}

/// At most `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
